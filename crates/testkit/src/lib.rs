use std::path::Path;

use ambari2graphite_core::model::PublishedPoint;
use serde_json::{Value, json};

/// Points produced by the valid documents written by [`write_fixture_dir`].
pub const FIXTURE_POINTS: usize = 6;

pub fn component_document() -> Value {
    json!({
        "href": "https://hdi.azurehdinsight.net/api/v1/clusters/hdi/services/HDFS/components/NAMENODE",
        "ServiceComponentInfo": {
            "cluster_name": "hdi",
            "service_name": "HDFS",
            "component_name": "NAMENODE"
        },
        "metrics": {
            "cpu": {
                "user": [[0.5, 100], [0.7, 200]]
            }
        }
    })
}

pub fn component_points() -> Vec<PublishedPoint> {
    vec![
        PublishedPoint::new("HDFS.NAMENODEMetrics.cpu.user", 0.5, 100),
        PublishedPoint::new("HDFS.NAMENODEMetrics.cpu.user", 0.7, 200),
    ]
}

pub fn host_list_document() -> Value {
    json!({
        "href": "https://hdi.azurehdinsight.net/api/v1/clusters/hdi/host_components",
        "items": [
            {
                "HostRoles": {
                    "cluster_name": "hdi",
                    "component_name": "DATANODE",
                    "host_name": "wn0-hdi.internal.cloudapp.net"
                },
                "metrics": {
                    "disk": {
                        "read_bytes": [[1024.0, 100], [2048.0, 115]],
                        "write_bytes": [[512.0, 100]]
                    }
                }
            },
            {
                "HostRoles": {
                    "cluster_name": "hdi",
                    "component_name": "DATANODE",
                    "host_name": "wn1-hdi.internal.cloudapp.net"
                },
                "metrics": {}
            },
            {
                "HostRoles": {
                    "cluster_name": "hdi",
                    "component_name": "DATANODE",
                    "host_name": "wn2-hdi.internal.cloudapp.net"
                },
                "metrics": {
                    "cpu": {
                        "cpu_user": [[12.5, 130]]
                    }
                }
            }
        ]
    })
}

/// Two valid documents, one malformed file and one unrecognized document.
pub fn write_fixture_dir(dir: &Path) -> std::io::Result<()> {
    std::fs::write(dir.join("hdi___0___0"), component_document().to_string())?;
    std::fs::write(dir.join("hdi___1___0"), host_list_document().to_string())?;
    std::fs::write(dir.join("hdi___2___0"), "{\"items\": [")?;
    std::fs::write(dir.join("hdi___3___0"), json!({"href": "x"}).to_string())?;
    std::fs::create_dir_all(dir.join("archive"))?;
    Ok(())
}
