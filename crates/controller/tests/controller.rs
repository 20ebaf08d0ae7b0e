use azurefile_controller::{
  account::AccountResolver,
  cloud::{fake::FakeCloud, Account, CloudError, Share, SKIP_MATCHING_TAG},
  copy::{CopyOptions, CopyOrchestrator},
  lock::OperationLocks,
  shares::{LimitFallback, Settings, ShareManager, GIB},
  Driver,
};
use azurefile_csi_proto::{
  controller::{
    AccessMode, AccessType, CapacityRange, ControllerCapabilities, ControllerExpandVolumeRequest,
    CreateSnapshotRequest, CreateVolumeRequest, DeleteSnapshotRequest, DeleteVolumeRequest,
    MountVolume, ValidateVolumeCapabilitiesRequest, ValidateVolumeCapabilitiesResponse,
    VolumeCapability, VolumeContentSource,
  },
  ControllerService, IdentityService, VolumeExpansionSupport,
};
use azurefile_exec::{
  fake::{FakeResponse, FakeRunner},
  Output,
};
use std::{collections::HashMap, sync::Arc, time::Duration};
use tonic::{Code, Status};

const RG: &str = "rg";

struct Harness {
  fake: FakeCloud,
  runner: FakeRunner,
  locks: OperationLocks,
  driver: Driver,
}

fn settings() -> Settings {
  Settings {
    subscription_id: "sub".into(),
    resource_group: RG.into(),
    location: Some("westeurope".into()),
    ..Settings::default()
  }
}

fn harness_with(fake: FakeCloud, settings: Settings) -> Harness {
  let runner = FakeRunner::new();
  let locks = OperationLocks::new();
  let cloud = fake.cloud();
  let copier = CopyOrchestrator::new(
    Arc::new(runner.clone()),
    CopyOptions {
      poll_interval: Duration::from_millis(10),
      ..CopyOptions::default()
    },
    None,
  );
  let shares = ShareManager::new(
    cloud.clone(),
    AccountResolver::new(cloud, Duration::from_secs(60), "f"),
    locks.clone(),
    copier,
    settings,
  );

  Harness {
    fake,
    runner,
    locks,
    driver: Driver::new("file.csi.azure.com", shares),
  }
}

fn harness() -> Harness {
  let fake = FakeCloud::new();
  fake.add_account(
    RG,
    Account {
      name: "acct".into(),
      sku: Some("Standard_LRS".into()),
      location: Some("westeurope".into()),
      ..Account::default()
    },
  );
  harness_with(fake, settings())
}

fn mount() -> VolumeCapability {
  VolumeCapability::new(
    AccessMode::MultiNodeMultiWriter,
    AccessType::Mount(MountVolume::default()),
  )
}

fn block() -> VolumeCapability {
  VolumeCapability::new(AccessMode::SingleNodeWriter, AccessType::Block)
}

fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
  pairs
    .iter()
    .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
    .collect()
}

fn create(name: &str, gib: u64, pairs: &[(&str, &str)]) -> CreateVolumeRequest {
  CreateVolumeRequest::new(name, vec![mount()])
    .with_capacity_range(CapacityRange::new(gib * GIB, 0))
    .with_parameters(params(pairs))
}

fn status(err: impl Into<Status>) -> (Code, String) {
  let status = err.into();
  (status.code(), status.message().to_owned())
}

fn account_secrets(account: &str, key: &str) -> HashMap<String, String> {
  params(&[("azurestorageaccountname", account), ("azurestorageaccountkey", key)])
}

fn share(name: &str, quota: u32) -> Share {
  Share {
    name: name.into(),
    quota_gib: Some(quota),
    ..Share::default()
  }
}

#[test]
fn identity_and_capabilities() {
  let h = harness();
  assert_eq!(h.driver.name(), "file.csi.azure.com");
  assert_eq!(
    h.driver.volume_expansion_support(),
    VolumeExpansionSupport::Online
  );
  assert_eq!(
    h.driver.capabilities(),
    ControllerCapabilities::CREATE_DELETE_VOLUME
      | ControllerCapabilities::CREATE_DELETE_SNAPSHOT
      | ControllerCapabilities::EXPAND_VOLUME
      | ControllerCapabilities::CLONE_VOLUME
  );
}

#[tokio::test]
async fn create_on_fixed_account() {
  let h = harness();
  let volume = h
    .driver
    .create_volume(create("pvc-1", 5, &[("storageAccount", "acct"), ("resourceGroup", RG)]))
    .await
    .unwrap();

  assert_eq!(
    volume.volume_id(),
    "rg#acct#pvc-1##default#azure-storage-account-acct-secret"
  );
  assert_eq!(volume.capacity_bytes(), 5 * GIB);
  assert_eq!(h.fake.share("acct", "pvc-1").unwrap().quota_gib, Some(5));
  assert_eq!(
    volume.volume_context().get("storageAccount").map(String::as_str),
    Some("acct")
  );

  let secret = h
    .fake
    .secret("default", "azure-storage-account-acct-secret")
    .unwrap();
  assert_eq!(
    secret.get("azurestorageaccountname").map(String::as_str),
    Some("acct")
  );
}

#[tokio::test]
async fn default_quota_without_capacity() {
  let h = harness();
  let request = CreateVolumeRequest::new("pvc-1", vec![mount()])
    .with_parameters(params(&[("storageAccount", "acct"), ("storeAccountKey", "false")]));
  let volume = h.driver.create_volume(request).await.unwrap();

  assert_eq!(volume.volume_id(), "rg#acct#pvc-1###");
  assert_eq!(volume.capacity_bytes(), 100 * GIB);
}

#[tokio::test]
async fn quota_is_rounded_up() {
  let h = harness();
  let request = CreateVolumeRequest::new("pvc-1", vec![mount()])
    .with_capacity_range(CapacityRange::new(GIB + 1, 0))
    .with_parameters(params(&[("storageAccount", "acct")]));
  let volume = h.driver.create_volume(request).await.unwrap();

  assert_eq!(volume.capacity_bytes(), 2 * GIB);
}

#[tokio::test]
async fn nfs_requires_premium() {
  let h = harness();
  let err = h
    .driver
    .create_volume(create("v1", 5, &[("protocol", "nfs"), ("skuName", "Standard_LRS")]))
    .await
    .unwrap_err();

  assert_eq!(
    status(err),
    (
      Code::InvalidArgument,
      "nfs protocol only supports premium storage, current account type: Standard_LRS".to_owned()
    )
  );
  assert!(h.fake.get_log().is_empty());
}

#[tokio::test]
async fn nfs_rejects_snapshot_restore() {
  let h = harness();
  let request = create("v1", 100, &[("protocol", "nfs")])
    .with_content_source(VolumeContentSource::Snapshot("rg#acct#share#tag".into()));
  let err = h.driver.create_volume(request).await.unwrap_err();

  assert_eq!(
    status(err),
    (
      Code::InvalidArgument,
      "protocol nfs is not supported for snapshot restore".to_owned()
    )
  );
}

#[tokio::test]
async fn block_volumes_need_vhd() {
  let h = harness();
  let request = CreateVolumeRequest::new("pvc-1", vec![block()]);
  let err = h.driver.create_volume(request).await.unwrap_err();

  assert_eq!(
    status(err),
    (
      Code::InvalidArgument,
      "CreateVolume Volume capabilities not valid: driver does not support block volumes".to_owned()
    )
  );
}

#[tokio::test]
async fn unknown_parameter() {
  let h = harness();
  let err = h
    .driver
    .create_volume(create("pvc-1", 5, &[("unknown", "x")]))
    .await
    .unwrap_err();

  assert_eq!(
    status(err),
    (
      Code::InvalidArgument,
      "invalid parameter \"unknown\" in storage class".to_owned()
    )
  );
}

#[tokio::test]
async fn existing_bigger_share_is_reused() {
  let h = harness();
  h.fake.add_share("acct", share("pvc-1", 100));

  let volume = h
    .driver
    .create_volume(create("pvc-1", 5, &[("storageAccount", "acct")]))
    .await
    .unwrap();

  assert_eq!(volume.capacity_bytes(), 100 * GIB);
  assert!(h.fake.calls("create_share").is_empty());
}

#[tokio::test]
async fn existing_smaller_share_conflicts() {
  let h = harness();
  h.fake.add_share("acct", share("pvc-1", 1));

  let err = h
    .driver
    .create_volume(create("pvc-1", 100, &[("storageAccount", "acct")]))
    .await
    .unwrap_err();

  let (code, message) = status(err);
  assert_eq!(code, Code::AlreadyExists);
  assert!(message.contains("already exists, but its capacity 1 is smaller than 100"));
}

#[tokio::test]
async fn share_without_quota_is_internal() {
  let h = harness();
  h.fake.add_share(
    "acct",
    Share {
      name: "pvc-1".into(),
      ..Share::default()
    },
  );

  let err = h
    .driver
    .create_volume(create("pvc-1", 5, &[("storageAccount", "acct")]))
    .await
    .unwrap_err();

  assert_eq!(
    status(err),
    (
      Code::Internal,
      "FileShareProperties or FileShareProperties.ShareQuota is nil".to_owned()
    )
  );
}

#[tokio::test]
async fn held_lock_aborts_create() {
  let h = harness();
  let _held = h.locks.lock("pvc-1").unwrap();

  let err = h
    .driver
    .create_volume(create("pvc-1", 5, &[("storageAccount", "acct")]))
    .await
    .unwrap_err();

  assert_eq!(status(err).0, Code::Aborted);
  assert!(h.fake.get_log().is_empty());
}

#[tokio::test]
async fn concurrent_creates_of_one_name_have_one_winner() {
  let h = harness();
  h.fake.add_share("acct", share("src", 10));
  h.runner
    .script(&["jobs", "list"], vec![Output::ok("No jobs")])
    .script(&["copy"], vec![FakeResponse::Exit(Output::ok("done"))]);
  let request = || {
    create("pvc-1", 10, &[("storageAccount", "acct")])
      .with_content_source(VolumeContentSource::Volume("rg#acct#src#".into()))
  };

  // The copy poll keeps the first call inside the lock while the second runs.
  let (first, second) = tokio::join!(
    h.driver.create_volume(request()),
    h.driver.create_volume(request())
  );

  let mut outcomes = vec![
    first.err().map(|err| status(err).0),
    second.err().map(|err| status(err).0),
  ];
  outcomes.sort_by_key(Option::is_some);
  assert_eq!(outcomes, vec![None, Some(Code::Aborted)]);
  assert_eq!(h.fake.calls("create_share").len(), 1);
  assert_eq!(h.runner.calls(&["copy"]), 1);
}

#[tokio::test]
async fn oversized_capacity_is_rejected() {
  let h = harness();
  let request = CreateVolumeRequest::new("pvc-1", vec![mount()])
    .with_capacity_range(CapacityRange::new(u64::MAX, 0))
    .with_parameters(params(&[("storageAccount", "acct")]));
  let err = h.driver.create_volume(request).await.unwrap_err();

  let (code, message) = status(err);
  assert_eq!(code, Code::InvalidArgument);
  assert!(message.contains("exceeds the largest share quota"));
  assert!(h.fake.calls("create_share").is_empty());
}

#[tokio::test]
async fn new_account_is_created_when_nothing_matches() {
  let h = harness_with(FakeCloud::new(), settings());

  let volume = h
    .driver
    .create_volume(create("pvc-1", 5, &[("skuName", "Premium_LRS")]))
    .await
    .unwrap();

  let accounts = h.fake.accounts();
  assert_eq!(accounts.len(), 1);
  let account = &accounts[0];
  assert!(account.name.starts_with('f'));
  assert_eq!(account.sku.as_deref(), Some("Premium_LRS"));
  assert_eq!(
    account.tags.get("k8s-azure-created-by").map(String::as_str),
    Some("azure")
  );
  assert_eq!(volume.capacity_bytes(), 100 * GIB);
}

#[tokio::test]
async fn random_matching_without_candidates() {
  let h = harness_with(FakeCloud::new(), settings());

  let err = h
    .driver
    .create_volume(create("pvc-1", 5, &[("selectRandomMatchingAccount", "true")]))
    .await
    .unwrap_err();

  assert_eq!(
    status(err),
    (
      Code::NotFound,
      "no storage account matching the requested properties found in resource group(rg)".to_owned()
    )
  );
}

#[tokio::test]
async fn full_account_is_skipped() {
  let h = harness();
  h.fake.fail(
    "create_share",
    CloudError::from_message("TotalSharesProvisionedCapacityExceedsAccountLimit"),
  );

  let volume = h
    .driver
    .create_volume(create("pvc-1", 5, &[]))
    .await
    .unwrap();

  let full = h.fake.account(RG, "acct").unwrap();
  assert_eq!(
    full.tags.get(SKIP_MATCHING_TAG).map(String::as_str),
    Some("true")
  );
  assert!(!volume.volume_id().starts_with("rg#acct#"));
  assert_eq!(h.fake.calls("create_share").len(), 2);
}

#[tokio::test]
async fn full_account_retries_are_bounded() {
  let h = harness_with(
    {
      let fake = FakeCloud::new();
      fake.add_account(
        RG,
        Account {
          name: "acct".into(),
          sku: Some("Standard_LRS".into()),
          ..Account::default()
        },
      );
      fake
    },
    Settings {
      account_limit_retries: 1,
      account_limit_fallback: LimitFallback::Same,
      ..settings()
    },
  );
  let limit = CloudError::from_message("TotalSharesCountExceedsAccountLimit");
  h.fake
    .fail("create_share", limit.clone())
    .fail("create_share", limit);

  let err = h
    .driver
    .create_volume(create("pvc-1", 5, &[("storageAccount", "acct")]))
    .await
    .unwrap_err();

  assert_eq!(status(err).0, Code::Internal);
  assert_eq!(h.fake.calls("create_share").len(), 2);
  assert!(h.fake.calls("add_tags").is_empty());
}

#[tokio::test]
async fn vhd_disk_is_created_inside_the_share() {
  let h = harness_with(
    {
      let fake = FakeCloud::new();
      fake.add_account(RG, Account { name: "acct".into(), ..Account::default() });
      fake
    },
    Settings {
      enable_vhd: true,
      ..settings()
    },
  );

  let volume = h
    .driver
    .create_volume(create(
      "pvc-1",
      1,
      &[("storageAccount", "acct"), ("fsType", "ext4"), ("storeAccountKey", "false")],
    ))
    .await
    .unwrap();

  assert_eq!(volume.volume_id(), "rg#acct#pvc-1#pvc-1.vhd##");
  let disk = h.fake.file("acct", "pvc-1", "pvc-1.vhd").unwrap();
  assert_eq!(disk.size, GIB + 512);
  assert_eq!(disk.ranges.len(), 1);
  assert_eq!(disk.ranges[0].0, GIB);
  assert_eq!(&disk.ranges[0].1[..8], b"conectix");
}

#[tokio::test]
async fn rejected_key_is_dropped_from_the_cache() {
  let h = harness_with(
    {
      let fake = FakeCloud::new();
      fake.add_account(RG, Account { name: "acct".into(), ..Account::default() });
      fake
    },
    Settings {
      enable_vhd: true,
      ..settings()
    },
  );
  h.fake.fail(
    "create_file",
    CloudError::Unauthorized("AuthenticationFailed".into()),
  );
  let request = || {
    create(
      "pvc-1",
      1,
      &[("storageAccount", "acct"), ("fsType", "ext4"), ("storeAccountKey", "false")],
    )
  };

  let err = h.driver.create_volume(request()).await.unwrap_err();
  assert_eq!(status(err).0, Code::Internal);

  h.driver.create_volume(request()).await.unwrap();
  assert_eq!(h.fake.calls("list_keys").len(), 2);
}

#[tokio::test]
async fn restore_from_snapshot_runs_azcopy() {
  let h = harness();
  h.fake.add_share("acct", share("src", 10));
  h.runner
    .script(&["jobs", "list"], vec![Output::ok("No jobs")])
    .script(&["copy"], vec![FakeResponse::Exit(Output::ok("done"))]);

  let request = create("pvc-2", 10, &[("storageAccount", "acct")])
    .with_content_source(VolumeContentSource::Snapshot("rg#acct#src#2021-01-01T00:00:01.0000000Z".into()));
  let volume = h.driver.create_volume(request).await.unwrap();

  assert_eq!(
    volume.content_source(),
    Some(&VolumeContentSource::Snapshot("rg#acct#src#2021-01-01T00:00:01.0000000Z".into()))
  );
  let copies: Vec<String> = h
    .runner
    .get_log()
    .iter()
    .filter(|c| c.has_prefix(&["copy"]))
    .map(|c| c.to_string())
    .collect();
  assert_eq!(
    copies,
    vec!["azcopy copy <redacted> <redacted> --recursive --check-length=false"]
  );
  let source = h.runner.get_log()[1].get_args()[1].value().to_owned();
  assert!(source.starts_with(
    "https://acct.file.core.windows.net/src?sharesnapshot=2021-01-01T00:00:01.0000000Z"
  ));
}

#[tokio::test]
async fn storage_endpoint_suffix_reaches_azcopy() {
  let h = harness();
  h.fake.add_share("acct", share("src", 10));
  h.runner
    .script(&["jobs", "list"], vec![Output::ok("No jobs")])
    .script(&["copy"], vec![FakeResponse::Exit(Output::ok("done"))]);

  let request = create(
    "pvc-2",
    10,
    &[("storageAccount", "acct"), ("storageEndpointSuffix", "core.chinacloudapi.cn")],
  )
  .with_content_source(VolumeContentSource::Volume("rg#acct#src#".into()));
  h.driver.create_volume(request).await.unwrap();

  let copy = h
    .runner
    .get_log()
    .into_iter()
    .find(|c| c.has_prefix(&["copy"]))
    .unwrap();
  assert!(copy.get_args()[1]
    .value()
    .starts_with("https://acct.file.core.chinacloudapi.cn/src?"));
  assert!(copy.get_args()[2]
    .value()
    .starts_with("https://acct.file.core.chinacloudapi.cn/pvc-2?"));
}

#[tokio::test]
async fn clone_source_key_comes_from_request_secrets() {
  let h = harness();
  h.runner
    .script(&["jobs", "list"], vec![Output::ok("No jobs")])
    .script(&["copy"], vec![FakeResponse::Exit(Output::ok("done"))]);

  // "other" is unknown to the management api, only the secrets reach it.
  let request = create("pvc-2", 10, &[("storageAccount", "acct")])
    .with_content_source(VolumeContentSource::Volume("rg#other#src#".into()))
    .with_secrets(account_secrets("other", "b3RoZXIta2V5"));
  h.driver.create_volume(request).await.unwrap();

  assert_eq!(h.runner.calls(&["copy"]), 1);
  assert!(h
    .fake
    .calls("list_keys")
    .iter()
    .all(|c| c == "list_keys:acct"));
}

#[tokio::test]
async fn clone_with_bad_source_is_not_found() {
  let h = harness();
  let request = create("pvc-2", 10, &[("storageAccount", "acct")])
    .with_content_source(VolumeContentSource::Volume("vol_1".into()));
  let err = h.driver.create_volume(request).await.unwrap_err();

  assert_eq!(status(err).0, Code::NotFound);
}

#[tokio::test]
async fn delete_is_idempotent() {
  let h = harness();
  h.fake.add_share("acct", share("share", 10));

  for _ in 0..2 {
    h.driver
      .delete_volume(DeleteVolumeRequest::new("rg#acct#share#"))
      .await
      .unwrap();
  }

  assert!(h.fake.share("acct", "share").is_none());
  assert_eq!(h.fake.calls("delete_share").len(), 2);
}

#[tokio::test]
async fn delete_invalid_id_is_a_noop() {
  let h = harness();
  for id in &["vol_1", "vol_1###"] {
    h.driver
      .delete_volume(DeleteVolumeRequest::new(*id))
      .await
      .unwrap();
  }

  assert!(h.fake.get_log().is_empty());
}

#[tokio::test]
async fn delete_backend_error() {
  let h = harness();
  h.fake.fail("delete_share", CloudError::Other("boom".into()));

  let err = h
    .driver
    .delete_volume(DeleteVolumeRequest::new("rg#acct#share#"))
    .await
    .unwrap_err();

  assert_eq!(
    status(err),
    (
      Code::Internal,
      "DeleteFileShare share under account(acct) rg(rg) failed with error: boom".to_owned()
    )
  );
}

#[tokio::test]
async fn delete_with_request_secrets_uses_the_data_plane() {
  let h = harness();
  h.fake.add_share("acct", share("share", 10));
  let key = base64::Engine::encode(&base64::engine::general_purpose::STANDARD, "acct-key");

  h.driver
    .delete_volume(DeleteVolumeRequest::new("rg#acct#share#").with_secrets(account_secrets("acct", &key)))
    .await
    .unwrap();

  assert!(h.fake.share("acct", "share").is_none());
  assert_eq!(h.fake.calls("remove_share"), vec!["remove_share:acct,share"]);
  assert!(h.fake.calls("delete_share").is_empty());
}

#[tokio::test]
async fn delete_with_rejected_key() {
  let h = harness();
  h.fake.add_share("acct", share("share", 10));

  let err = h
    .driver
    .delete_volume(DeleteVolumeRequest::new("rg#acct#share#").with_secrets(account_secrets("acct", "d3Jvbmc=")))
    .await
    .unwrap_err();

  let (code, message) = status(err);
  assert_eq!(code, Code::Internal);
  assert!(message.starts_with("DeleteFileShare share under account(acct) rg(rg) failed with error: AuthenticationFailed"));
  assert!(h.fake.share("acct", "share").is_some());
}

#[tokio::test]
async fn delete_with_missing_secret_is_not_found() {
  let h = harness();
  let err = h
    .driver
    .delete_volume(DeleteVolumeRequest::new("rg#acct#share###missing"))
    .await
    .unwrap_err();

  let (code, message) = status(err);
  assert_eq!(code, Code::NotFound);
  assert!(message.starts_with(
    "get account info from(rg#acct#share###missing) failed with error: could not get account key from secret(missing): "
  ));
  assert!(h.fake.calls("delete_share").is_empty());
}

#[tokio::test]
async fn cross_subscription_volume_round_trip() {
  let fake = FakeCloud::new();
  fake.add_account(
    "rg2",
    Account {
      name: "acct".into(),
      sku: Some("Standard_LRS".into()),
      ..Account::default()
    },
  );
  let h = harness_with(fake, settings());

  let volume = h
    .driver
    .create_volume(create(
      "pvc-1",
      5,
      &[("subscriptionID", "other-sub"), ("resourceGroup", "rg2"), ("storageAccount", "acct")],
    ))
    .await
    .unwrap();
  let id = volume.volume_id().to_owned();
  assert_eq!(id, "rg2#acct#pvc-1##default#azure-storage-account-acct-secret");

  h.driver
    .controller_expand_volume(ControllerExpandVolumeRequest::new(
      id.as_str(),
      CapacityRange::new(20 * GIB, 0),
    ))
    .await
    .unwrap();
  assert_eq!(h.fake.share("acct", "pvc-1").unwrap().quota_gib, Some(20));

  let snapshot = h
    .driver
    .create_snapshot(CreateSnapshotRequest::new("snap-1", id.as_str()))
    .await
    .unwrap();
  assert_eq!(snapshot.size_bytes(), 20 * GIB);

  let key = h
    .fake
    .secret("default", "azure-storage-account-acct-secret")
    .unwrap()["azurestorageaccountkey"]
    .clone();
  h.driver
    .delete_snapshot(
      DeleteSnapshotRequest::new(snapshot.snapshot_id()).with_secrets(account_secrets("acct", &key)),
    )
    .await
    .unwrap();
  assert!(h.fake.snapshots("acct", "pvc-1").is_empty());

  h.driver
    .delete_volume(DeleteVolumeRequest::new(id.as_str()))
    .await
    .unwrap();
  assert!(h.fake.share("acct", "pvc-1").is_none());

  // Nothing after creation went through the driver's own subscription.
  for op in &["resize_share", "create_snapshot", "delete_snapshot", "delete_share"] {
    assert!(h.fake.calls(op).is_empty(), "{} used the management api", op);
  }
  assert_eq!(h.fake.calls("set_share_quota").len(), 1);
  assert_eq!(h.fake.calls("snapshot_share").len(), 1);
  assert_eq!(h.fake.calls("remove_share_snapshot").len(), 1);
  assert_eq!(h.fake.calls("remove_share").len(), 1);
}

#[tokio::test]
async fn expand_share() {
  let h = harness();
  h.fake.add_share("acct", share("share", 10));

  let response = h
    .driver
    .controller_expand_volume(ControllerExpandVolumeRequest::new(
      "rg#acct#share#",
      CapacityRange::new(20 * GIB, 0),
    ))
    .await
    .unwrap();

  assert_eq!(response.capacity_bytes(), 20 * GIB);
  assert!(!response.node_expansion_required());
  assert_eq!(h.fake.share("acct", "share").unwrap().quota_gib, Some(20));
}

#[tokio::test]
async fn expand_vhd_is_unimplemented() {
  let h = harness();
  let err = h
    .driver
    .controller_expand_volume(ControllerExpandVolumeRequest::new(
      "rg#acct#share#disk.vhd",
      CapacityRange::new(20 * GIB, 0),
    ))
    .await
    .unwrap_err();

  assert_eq!(
    status(err),
    (
      Code::Unimplemented,
      "vhd disk volume(rg#acct#share#disk.vhd, diskName:disk.vhd) is not supported on ControllerExpandVolume".to_owned()
    )
  );
}

#[tokio::test]
async fn expand_invalid_id() {
  let h = harness();
  let err = h
    .driver
    .controller_expand_volume(ControllerExpandVolumeRequest::new(
      "vol_1",
      CapacityRange::new(GIB, 0),
    ))
    .await
    .unwrap_err();

  assert_eq!(
    status(err),
    (
      Code::InvalidArgument,
      "GetFileShareInfo(vol_1) failed with error: error parsing volume id: \"vol_1\", should at least contain two #".to_owned()
    )
  );
}

#[tokio::test]
async fn snapshot_lifecycle() {
  let h = harness();
  h.fake.add_share("acct", share("share", 10));

  let snapshot = h
    .driver
    .create_snapshot(CreateSnapshotRequest::new("snap-1", "rg#acct#share#"))
    .await
    .unwrap();
  assert_eq!(
    snapshot.snapshot_id(),
    "rg#acct#share#2021-01-01T00:00:01.0000000Z"
  );
  assert_eq!(snapshot.source_volume_id(), "rg#acct#share#");
  assert_eq!(snapshot.size_bytes(), 10 * GIB);
  assert!(snapshot.ready_to_use());

  let again = h
    .driver
    .create_snapshot(CreateSnapshotRequest::new("snap-1", "rg#acct#share#"))
    .await
    .unwrap();
  assert_eq!(again.snapshot_id(), snapshot.snapshot_id());
  assert_eq!(h.fake.calls("create_snapshot").len(), 1);

  for _ in 0..2 {
    h.driver
      .delete_snapshot(DeleteSnapshotRequest::new(snapshot.snapshot_id()))
      .await
      .unwrap();
  }
  assert!(h.fake.snapshots("acct", "share").is_empty());
}

#[tokio::test]
async fn snapshot_of_invalid_volume() {
  let h = harness();
  let err = h
    .driver
    .create_snapshot(CreateSnapshotRequest::new("snap-1", "vol_1"))
    .await
    .unwrap_err();

  assert_eq!(status(err).0, Code::Internal);
}

#[tokio::test]
async fn delete_snapshot_needs_four_fields() {
  let h = harness();
  let err = h
    .driver
    .delete_snapshot(DeleteSnapshotRequest::new("rg#acct#share"))
    .await
    .unwrap_err();

  let (code, message) = status(err);
  assert_eq!(code, Code::Internal);
  assert!(message.contains("should at least contain four #"));
}

#[tokio::test]
async fn validate_capabilities() {
  let h = harness();
  h.fake.add_share("acct", share("share", 10));

  let confirmed = h
    .driver
    .validate_volume_capabilities(ValidateVolumeCapabilitiesRequest::new(
      "rg#acct#share#",
      vec![mount()],
    ))
    .await
    .unwrap();
  assert!(matches!(
    confirmed,
    ValidateVolumeCapabilitiesResponse::Confirmed(_)
  ));

  let block = h
    .driver
    .validate_volume_capabilities(ValidateVolumeCapabilitiesRequest::new(
      "rg#acct#share#",
      vec![block()],
    ))
    .await
    .unwrap();
  assert_eq!(
    block,
    ValidateVolumeCapabilitiesResponse::Message("driver does not support block volumes".into())
  );
}

#[tokio::test]
async fn validate_missing_volume() {
  let h = harness();
  let err = h
    .driver
    .validate_volume_capabilities(ValidateVolumeCapabilitiesRequest::new(
      "rg#acct#missing#",
      vec![mount()],
    ))
    .await
    .unwrap_err();

  assert_eq!(
    status(err),
    (
      Code::NotFound,
      "the requested volume(rg#acct#missing#) does not exist.".to_owned()
    )
  );
}
