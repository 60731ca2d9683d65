pub mod ambari;
pub mod forward;
pub mod local;
pub mod pipeline;
