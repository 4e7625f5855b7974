//! Runtime behavior tests. Everything here runs without root except the
//! ignored full-lifecycle scenario at the bottom.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use vessel_common::error::VesselError;
use vessel_common::types::{ContainerId, RunOptions};
use vessel_runtime::volume::VolumeStore;
use vessel_runtime::{container, lifecycle};

#[test]
#[cfg(target_os = "linux")]
fn attaching_to_an_unknown_container_fails_before_any_namespace_work() {
    let result = vessel_runtime::attach::attach("0000000000000000", &["sh".to_string()]);
    assert!(matches!(
        result,
        Err(VesselError::NotFound {
            kind: "container",
            ..
        })
    ));
}

#[test]
fn child_argument_vector_round_trips_the_run_options() {
    let id = ContainerId::new("deadbeefcafe0123");
    let options = RunOptions {
        cpu_limit: 1.5,
        mem_limit_mb: 512,
        bind_mount: Some("src=/opt/data,dest=/data".parse().expect("bind parse")),
        volume: Some("cache:/var/cache".parse().expect("volume parse")),
    };
    let args = lifecycle::child_args(&id, &options, &["sleep".to_string(), "5".to_string()]);

    assert_eq!(args[0], "child-mode");
    assert!(args.windows(2).any(|w| w == ["--id", "deadbeefcafe0123"]));
    assert!(args.windows(2).any(|w| w == ["--mount", "src=/opt/data,dest=/data"]));
    assert!(args.windows(2).any(|w| w == ["--volume", "cache:/var/cache"]));
    let separator = args.iter().position(|a| a == "--").expect("separator");
    assert_eq!(&args[separator + 1..], ["sleep", "5"]);
}

#[test]
fn volume_lifecycle_create_inspect_remove() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let store = VolumeStore::open_at(dir.path()).expect("open failed");

    let created = store.create("scratch").expect("create failed");
    let inspected = store.inspect("scratch").expect("inspect failed");
    assert_eq!(created.mount_point, inspected.mount_point);

    store.remove("scratch").expect("remove failed");
    assert!(store.inspect("scratch").is_err());
}

#[test]
fn layer_links_survive_a_simulated_restart() {
    let dir = tempfile::tempdir().expect("failed to create tempdir");
    let layer = dir.path().join("images/aaaaaaaaaaaaaaaa");
    std::fs::create_dir_all(&layer).expect("mkdir");

    let layers_dir = dir.path().join("layers");
    container::link_layers(&layers_dir, std::slice::from_ref(&layer)).expect("link failed");

    let recovered =
        vessel_core::filesystem::overlay::recover_layers(&layers_dir, "c1").expect("recover");
    assert_eq!(recovered, vec![layers_dir.join("aaaaaaaaaaaaaaaa")]);
}

#[test]
#[cfg(target_os = "linux")]
#[ignore = "requires root and network access"]
fn run_true_through_the_full_lifecycle() {
    use std::os::unix::fs::MetadataExt;

    let netns_before = std::fs::metadata("/proc/self/ns/net")
        .expect("can't stat /proc/self/ns/net")
        .ino();

    let request = lifecycle::RunRequest {
        image: "alpine".into(),
        options: RunOptions::default(),
        command: vec!["/bin/true".into()],
    };
    let code = lifecycle::run(&request).expect("run failed");
    assert_eq!(code, 0);

    // Teardown must have restored the host network namespace.
    let netns_after = std::fs::metadata("/proc/self/ns/net")
        .expect("can't stat /proc/self/ns/net")
        .ino();
    assert_eq!(netns_after, netns_before);
}
