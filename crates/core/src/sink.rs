use crate::error::Result;
use crate::model::PublishedPoint;

/// Destination for flattened points. Handed explicitly to the flattener so
/// each run owns exactly one.
pub trait PointSink {
    fn emit(&mut self, point: PublishedPoint) -> Result<()>;
}

impl PointSink for Vec<PublishedPoint> {
    fn emit(&mut self, point: PublishedPoint) -> Result<()> {
        self.push(point);
        Ok(())
    }
}

impl<S: PointSink + ?Sized> PointSink for &mut S {
    fn emit(&mut self, point: PublishedPoint) -> Result<()> {
        (**self).emit(point)
    }
}

impl<S: PointSink + ?Sized> PointSink for Box<S> {
    fn emit(&mut self, point: PublishedPoint) -> Result<()> {
        (**self).emit(point)
    }
}
