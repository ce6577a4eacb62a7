//! TDD-Light tests for pointer resolution and residency migration.

use mirrormem::device::MockBackendConfig;
use mirrormem::ledger::{HostAddr, Residency};
use mirrormem::{ManagerConfig, MemoryManager, MockDeviceBackend, Target};

use std::sync::Arc;

fn device_manager(target: Target) -> (MemoryManager, Arc<MockDeviceBackend>) {
    let backend = Arc::new(MockDeviceBackend::new(MockBackendConfig::default()));
    let manager = MemoryManager::new(
        backend.clone(),
        ManagerConfig {
            enable_device: true,
            target,
            ..ManagerConfig::default()
        },
    );
    (manager, backend)
}

fn residency_of(manager: &MemoryManager, ptr: *const u8) -> Residency {
    manager
        .ledger()
        .region(HostAddr::from_ptr(ptr))
        .unwrap()
        .residency()
}

#[test]
fn unmanaged_manager_passes_every_pointer_through() {
    let backend = Arc::new(MockDeviceBackend::new(MockBackendConfig::default()));
    let mut manager = MemoryManager::new(
        backend,
        ManagerConfig {
            managed: false,
            enable_device: true,
            target: Target::Device,
            ..ManagerConfig::default()
        },
    );
    let mut buf = vec![0u8; 32];
    let ptr = buf.as_mut_ptr();

    let resolved = manager.resolve(ptr).unwrap();
    assert_eq!(resolved.host_ptr(), Some(ptr));
}

#[test]
fn device_never_enabled_means_pass_through() {
    let backend = Arc::new(MockDeviceBackend::new(MockBackendConfig::default()));
    let mut manager = MemoryManager::new(backend.clone(), ManagerConfig::default());
    let mut buf = vec![0u8; 32];
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, buf.len()).unwrap() };

    let resolved = manager.resolve(ptr).unwrap();
    assert_eq!(resolved.host_ptr(), Some(ptr));
    assert_eq!(backend.alloc_count(), 0);
}

#[test]
fn disabling_the_device_path_restores_pass_through() {
    let (mut manager, backend) = device_manager(Target::Device);
    let mut buf = vec![0u8; 32];
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, buf.len()).unwrap() };

    manager.state_mut().disable_device();

    // Even unregistered pointers come back unchanged now.
    let resolved = manager.resolve(ptr).unwrap();
    assert_eq!(resolved.host_ptr(), Some(ptr));
    assert_eq!(backend.alloc_count(), 0);
}

#[test]
fn host_target_resolves_known_pointer_without_device_work() {
    let (mut manager, backend) = device_manager(Target::Host);
    let mut buf = vec![7u8; 64];
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, buf.len()).unwrap() };

    let resolved = manager.resolve(ptr).unwrap();
    assert_eq!(resolved.host_ptr(), Some(ptr));
    assert_eq!(backend.alloc_count(), 0);
    assert_eq!(backend.htod_count(), 0);
    assert_eq!(residency_of(&manager, ptr), Residency::Host);
}

#[test]
fn device_target_lazily_allocates_and_uploads() {
    let (mut manager, backend) = device_manager(Target::Device);
    let mut buf: Vec<u8> = (0..64u8).collect();
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, buf.len()).unwrap() };

    let resolved = manager.resolve(ptr).unwrap();
    let device = resolved.device_ptr().unwrap();

    assert_eq!(backend.alloc_count(), 1);
    assert_eq!(backend.htod_count(), 1);
    assert_eq!(residency_of(&manager, ptr), Residency::Device);
    assert_eq!(backend.read_bytes(device, 64).unwrap(), buf);
}

#[test]
fn steady_state_device_resolution_is_transfer_free() {
    let (mut manager, backend) = device_manager(Target::Device);
    let mut buf = vec![1u8; 64];
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, buf.len()).unwrap() };

    let first = manager.resolve(ptr).unwrap().device_ptr().unwrap();
    let second = manager.resolve(ptr).unwrap().device_ptr().unwrap();

    assert_eq!(first, second);
    assert_eq!(backend.alloc_count(), 1);
    assert_eq!(backend.htod_count(), 1);
}

#[test]
fn host_target_after_device_residency_migrates_back() {
    let (mut manager, backend) = device_manager(Target::Device);
    let mut buf: Vec<u8> = (0..32u8).collect();
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, buf.len()).unwrap() };
    manager.resolve(ptr).unwrap();
    assert_eq!(residency_of(&manager, ptr), Residency::Device);

    manager.state_mut().set_target(Target::Host);
    let resolved = manager.resolve(ptr).unwrap();

    assert_eq!(resolved.host_ptr(), Some(ptr));
    assert_eq!(backend.dtoh_count(), 1);
    assert_eq!(residency_of(&manager, ptr), Residency::Host);
    let expected: Vec<u8> = (0..32u8).collect();
    assert_eq!(buf, expected);
}

#[test]
fn alias_resolution_offsets_into_the_owners_buffer() {
    let (mut manager, backend) = device_manager(Target::Device);
    let mut buf: Vec<u8> = (0..64u8).collect();
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, buf.len()).unwrap() };

    let base_device = manager.resolve(ptr).unwrap().device_ptr().unwrap();
    let interior = unsafe { ptr.add(16) };
    let alias_device = manager.resolve(interior).unwrap().device_ptr().unwrap();

    assert_eq!(alias_device.as_raw(), base_device.as_raw() + 16);
    // The owner's buffer was uploaded once, in full.
    assert_eq!(backend.htod_count(), 1);
    assert_eq!(backend.read_bytes(alias_device, 4).unwrap(), &buf[16..20]);
}

#[test]
fn alias_resolution_can_trigger_the_owners_migration() {
    let (mut manager, backend) = device_manager(Target::Device);
    let mut buf = vec![3u8; 64];
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, buf.len()).unwrap() };

    // First touch is the interior pointer, not the base.
    let interior = unsafe { ptr.add(8) };
    let resolved = manager.resolve(interior).unwrap();

    assert!(resolved.is_device());
    assert_eq!(backend.alloc_count(), 1);
    assert_eq!(backend.htod_count(), 1);
    assert_eq!(residency_of(&manager, ptr), Residency::Device);
}

#[test]
fn alias_under_host_target_hands_back_the_original_pointer() {
    let (mut manager, backend) = device_manager(Target::Device);
    let mut buf: Vec<u8> = (0..64u8).collect();
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, buf.len()).unwrap() };
    manager.resolve(ptr).unwrap();

    manager.state_mut().set_target(Target::Host);
    let interior = unsafe { ptr.add(24) };
    let resolved = manager.resolve(interior).unwrap();

    assert_eq!(resolved.host_ptr(), Some(interior));
    // The whole owner span came back, not just the alias suffix.
    assert_eq!(backend.dtoh_count(), 1);
    assert_eq!(residency_of(&manager, ptr), Residency::Host);
}

#[test]
fn unknown_pointer_under_device_target_is_an_error() {
    let (mut manager, _backend) = device_manager(Target::Device);
    let mut buf = vec![0u8; 16];

    let err = manager.resolve(buf.as_mut_ptr()).unwrap_err();
    assert_eq!(err.kind(), "unknown_pointer");
}

#[test]
fn unknown_pointer_under_host_target_passes_through() {
    let (mut manager, _backend) = device_manager(Target::Host);
    let mut buf = vec![0u8; 16];
    let ptr = buf.as_mut_ptr();

    let resolved = manager.resolve(ptr).unwrap();
    assert_eq!(resolved.host_ptr(), Some(ptr));
}

#[test]
fn alternate_backend_with_device_path_enabled_is_rejected() {
    let backend = Arc::new(MockDeviceBackend::new(MockBackendConfig::default()));
    let mut manager = MemoryManager::new(
        backend,
        ManagerConfig {
            enable_device: true,
            alternate_backend: true,
            ..ManagerConfig::default()
        },
    );
    let mut buf = vec![0u8; 16];

    let err = manager.resolve(buf.as_mut_ptr()).unwrap_err();
    assert_eq!(err.kind(), "unsupported_backend");
}

#[test]
fn alternate_backend_without_device_path_passes_through() {
    let backend = Arc::new(MockDeviceBackend::new(MockBackendConfig::default()));
    let mut manager = MemoryManager::new(
        backend,
        ManagerConfig {
            alternate_backend: true,
            ..ManagerConfig::default()
        },
    );
    let mut buf = vec![0u8; 16];
    let ptr = buf.as_mut_ptr();

    let resolved = manager.resolve(ptr).unwrap();
    assert_eq!(resolved.host_ptr(), Some(ptr));
}

#[test]
fn zero_length_region_cannot_reach_the_device() {
    let (mut manager, _backend) = device_manager(Target::Device);
    let mut buf = vec![0u8; 16];
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, 0).unwrap() };

    let err = manager.resolve(ptr).unwrap_err();
    assert_eq!(err.kind(), "zero_length_region");
}

#[test]
fn mutating_on_host_then_retargeting_uploads_fresh_bytes() {
    let (mut manager, backend) = device_manager(Target::Host);
    let mut buf = vec![0u8; 32];
    let ptr = buf.as_mut_ptr();
    unsafe { manager.insert(ptr, buf.len()).unwrap() };
    manager.resolve(ptr).unwrap();

    buf.iter_mut().for_each(|b| *b = 9);
    manager.state_mut().set_target(Target::Device);
    let device = manager.resolve(ptr).unwrap().device_ptr().unwrap();

    assert_eq!(backend.read_bytes(device, 32).unwrap(), vec![9u8; 32]);
}
