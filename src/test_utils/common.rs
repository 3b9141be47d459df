use std::collections::BTreeMap;

use crate::models::Container;
use crate::models::Deployment;
use crate::models::ObjectMeta;
use crate::models::PodSpec;
use crate::models::PodTemplateSpec;

static LOGGER_INIT: once_cell::sync::Lazy<()> = once_cell::sync::Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
});

pub fn enable_logger() {
    *LOGGER_INIT;
    println!("setup logger for unit test.");
}

/// Namespace-less Deployment labelled `app=<name>` running one nginx container
pub fn deployment_fixture(
    name: &str,
    replicas: i32,
) -> Deployment {
    let labels = BTreeMap::from([("app".to_string(), name.to_string())]);
    let mut d = Deployment {
        metadata: ObjectMeta {
            name: name.to_string(),
            labels: labels.clone(),
            ..Default::default()
        },
        ..Default::default()
    };
    d.spec.replicas = Some(replicas);
    d.spec.selector.match_labels = labels.clone();
    d.spec.template = PodTemplateSpec {
        metadata: ObjectMeta {
            labels,
            ..Default::default()
        },
        spec: PodSpec {
            node_name: None,
            containers: vec![Container {
                name: "main".to_string(),
                image: "nginx:1.25".to_string(),
                ports: vec![],
            }],
        },
    };
    d
}
