use jsbridge::sim::{self, HostProbe, SimHost, SimObject, SimRuntime};
use jsbridge::{
    BridgeError, ClassId, ClassKind, Environment, NativePtr, ObjectId, Ownership, ReferencePolicy,
    ScriptRuntime,
};
use proptest::prelude::*;
use std::time::Duration;

type SimEnvironment = Environment<SimRuntime, SimHost>;

fn setup() -> (SimEnvironment, HostProbe, ClassId) {
    let host = SimHost::new();
    let probe = host.probe();
    let mut env = Environment::new(SimRuntime::new(), host);
    let sprite = env.register_class(ClassKind::HostObject, "Sprite").unwrap();
    (env, probe, sprite)
}

fn bind_new(env: &mut SimEnvironment, class_id: ClassId, policy: ReferencePolicy) -> (NativePtr, SimObject, ObjectId) {
    let pointer = env.host_mut().spawn(true);
    let wrapper = env.runtime_mut().new_object();
    let id = env.bind_pointer(class_id, pointer, wrapper, policy).unwrap();
    (pointer, wrapper, id)
}

#[test]
fn test_example_scenario() {
    let mut host = SimHost::new();
    let probe = host.probe();
    let pointer = host.spawn_at(0xA000, true).unwrap();
    // native code owns one reference before the object crosses over
    host.retain(pointer);

    let mut env = Environment::new(SimRuntime::new(), host);
    let sprite = env.register_class(ClassKind::HostObject, "Sprite").unwrap();
    assert_eq!(sprite, ClassId::new(0));

    let wrapper = env.runtime_mut().new_object();
    let id = env.bind_pointer(sprite, pointer, wrapper, ReferencePolicy::Reference).unwrap();
    assert_eq!(id, ObjectId::new(0, 0));
    assert_eq!(probe.bridge_references(), 1);
    assert_eq!(probe.reference_count(pointer), 2);

    // native code lets go; the live wrapper defers native death
    assert!(!env.host_mut().release(pointer));
    assert!(!env.on_reference_request(pointer, false));
    assert!(env.objects().handle(pointer).unwrap().is_release_deferred());
    assert!(env.unwrap().is_weak(wrapper));

    // script drops the wrapper and the collector finalizes it
    env.runtime_mut().release(wrapper);
    env.gc();

    assert!(probe.is_destroyed(pointer));
    assert_eq!(env.objects().lookup(pointer), None);
    assert!(env.on_reference_request(pointer, false));
    assert_eq!(probe.double_frees(), 0);
}

#[test]
fn test_double_bind_is_rejected() {
    let (mut env, _, sprite) = setup();
    let (pointer, _, id) = bind_new(&mut env, sprite, ReferencePolicy::Reference);
    let second = env.runtime_mut().new_object();

    match env.bind_pointer(sprite, pointer, second, ReferencePolicy::Reference) {
        Err(BridgeError::AlreadyBound { pointer: p, existing }) => {
            assert_eq!(p, pointer);
            assert_eq!(existing, id);
        }
        other => panic!("expected AlreadyBound, got {other:?}"),
    }
    assert_eq!(env.get_object(pointer), env.objects().get_wrapper(pointer).copied());
}

#[test]
fn test_round_trip_identity() {
    let (mut env, _, sprite) = setup();
    let policies = [
        ReferencePolicy::Reference,
        ReferencePolicy::NoReference,
        ReferencePolicy::ReferenceAlways,
    ];
    let pointers: Vec<_> = (0..30)
        .map(|i| bind_new(&mut env, sprite, policies[i % 3]).0)
        .collect();

    for pointer in pointers {
        let id = env.objects().lookup(pointer).unwrap();
        assert_eq!(env.objects().resolve(id).unwrap().pointer(), Some(pointer));
    }
    assert!(env.objects().is_consistent());
}

#[test]
fn test_stale_ids_do_not_resolve_after_rebind() {
    let (mut env, _, sprite) = setup();
    let (pointer, _, first) = bind_new(&mut env, sprite, ReferencePolicy::NoReference);

    assert!(env.unbind_pointer(pointer));
    let wrapper = env.runtime_mut().new_object();
    let second = env.bind_pointer(sprite, pointer, wrapper, ReferencePolicy::NoReference).unwrap();

    assert_ne!(first, second);
    assert_eq!(first.index(), second.index());
    assert!(env.objects().resolve(first).is_none());
    assert_eq!(env.objects().resolve(second).unwrap().pointer(), Some(pointer));
}

#[test]
fn test_unbind_is_idempotent() {
    let (mut env, probe, sprite) = setup();
    let (pointer, wrapper, _) = bind_new(&mut env, sprite, ReferencePolicy::Reference);
    bind_new(&mut env, sprite, ReferencePolicy::Reference);

    assert!(env.unbind_pointer(pointer));
    let after_first = env.statistics();
    assert!(!env.unbind_pointer(pointer));
    let after_second = env.statistics();

    assert_eq!(after_first, after_second);
    assert!(env.unwrap().is_invalidated(wrapper));
    assert_eq!(probe.bridge_unreferences(), 0);
}

#[test]
fn test_collector_and_explicit_unbind_race() {
    let (mut env, probe, sprite) = setup();
    let (pointer, wrapper, _) = bind_new(&mut env, sprite, ReferencePolicy::Reference);

    // the collector queues a finalizer, then native teardown unbinds first
    env.runtime_mut().release(wrapper);
    env.runtime_mut().collect_garbage();
    assert!(env.unbind_pointer(pointer));
    env.host_mut().destroy_native(pointer);

    env.update_with_elapsed(Duration::ZERO);
    assert_eq!(env.counters().finalized, 0);
    assert_eq!(probe.destroyed(), 1);
    assert_eq!(probe.double_frees(), 0);
}

#[test]
fn test_stale_finalizer_spares_rebound_address() {
    let (mut env, _, sprite) = setup();
    let (pointer, wrapper, _) = bind_new(&mut env, sprite, ReferencePolicy::Reference);

    env.runtime_mut().release(wrapper);
    env.runtime_mut().collect_garbage();
    env.unbind_pointer(pointer);
    env.host_mut().destroy_native(pointer);

    // the allocator hands the same address to a new object
    let reused = env.host_mut().spawn_at(pointer.addr(), true).unwrap();
    let fresh = env.runtime_mut().new_object();
    env.bind_pointer(sprite, reused, fresh, ReferencePolicy::Reference).unwrap();

    env.update_with_elapsed(Duration::ZERO);
    assert!(env.check_object(reused));
    assert_eq!(env.get_object(reused), Some(fresh));
}

#[test]
fn test_ownership_flips_with_native_references() {
    let (mut env, probe, sprite) = setup();
    let (pointer, wrapper, _) = bind_new(&mut env, sprite, ReferencePolicy::Reference);
    assert_eq!(env.objects().handle(pointer).unwrap().ownership(), Ownership::Script);

    sim::add_native_reference(&mut env, pointer);
    assert_eq!(env.objects().handle(pointer).unwrap().ownership(), Ownership::Shared);
    assert!(!env.unwrap().is_weak(wrapper));

    // rooted while native code holds it, even if script forgets the wrapper
    env.runtime_mut().release(wrapper);
    env.gc();
    assert!(env.check_object(pointer));

    assert!(!sim::release_native_reference(&mut env, pointer));
    assert_eq!(env.objects().handle(pointer).unwrap().ownership(), Ownership::Script);
    assert!(env.unwrap().is_weak(wrapper));
    assert_eq!(env.counters().ownership_flips, 2);

    env.gc();
    assert!(!env.check_object(pointer));
    assert!(probe.is_destroyed(pointer));
}

#[test]
fn test_collected_wrapper_releases_bridge_reference() {
    let (mut env, probe, sprite) = setup();
    let (pointer, wrapper, _) = bind_new(&mut env, sprite, ReferencePolicy::Reference);
    env.runtime_mut().set_deliver_finalizers(false);

    // collected without a notification, the binding outlives the wrapper
    env.runtime_mut().release(wrapper);
    env.gc();
    assert!(env.check_object(pointer));

    // a dead wrapper is not rooted again by a native reference
    sim::add_native_reference(&mut env, pointer);
    assert_eq!(env.objects().handle(pointer).unwrap().ownership(), Ownership::Script);
    assert_eq!(env.counters().ownership_flips, 0);

    assert!(sim::release_native_reference(&mut env, pointer));
    assert!(!env.check_object(pointer));
    assert_eq!(probe.reference_count(pointer), 0);
    assert_eq!(probe.bridge_unreferences(), 1);

    drop(env);
    assert_eq!(probe.live(), 0);
    assert_eq!(probe.destroyed(), 1);
    assert_eq!(probe.double_frees(), 0);
}

#[test]
fn test_missed_finalizer_after_deferred_release_is_swept() {
    let (mut env, probe, sprite) = setup();
    let (pointer, wrapper, _) = bind_new(&mut env, sprite, ReferencePolicy::Reference);
    sim::add_native_reference(&mut env, pointer);
    env.runtime_mut().set_deliver_finalizers(false);

    // native code lets go while the wrapper lives, then the wrapper dies quietly
    assert!(!sim::release_native_reference(&mut env, pointer));
    assert!(env.unwrap().is_weak(wrapper));
    env.runtime_mut().release(wrapper);
    env.gc();
    assert!(env.check_object(pointer));
    assert!(!probe.is_destroyed(pointer));

    drop(env);
    assert!(probe.is_destroyed(pointer));
    assert_eq!(probe.bridge_unreferences(), 1);
    assert_eq!(probe.double_frees(), 0);
}

#[test]
fn test_reference_always_stays_pinned() {
    let (mut env, probe, sprite) = setup();
    let (pointer, wrapper, _) = bind_new(&mut env, sprite, ReferencePolicy::ReferenceAlways);

    let handle = env.objects().handle(pointer).unwrap();
    assert_eq!(handle.ownership(), Ownership::Shared);
    assert!(handle.holds_reference());
    assert!(!env.unwrap().is_weak(wrapper));

    assert!(!env.on_reference_request(pointer, false));
    env.runtime_mut().release(wrapper);
    env.gc();
    assert!(env.check_object(pointer));
    assert_eq!(env.objects().handle(pointer).unwrap().ownership(), Ownership::Shared);

    drop(env);
    assert!(probe.is_destroyed(pointer));
}

#[test]
fn test_no_reference_is_native_owned() {
    let (mut env, probe, sprite) = setup();
    let (pointer, wrapper, _) = bind_new(&mut env, sprite, ReferencePolicy::NoReference);

    assert_eq!(probe.reference_count(pointer), 0);
    assert_eq!(env.objects().handle(pointer).unwrap().ownership(), Ownership::Native);

    env.runtime_mut().release(wrapper);
    env.gc();
    assert!(env.check_object(pointer));

    // sweep does not destroy what the bridge never owned
    drop(env);
    assert!(!probe.is_destroyed(pointer));
    assert_eq!(probe.bridge_unreferences(), 0);
}

#[test]
fn test_persistence_overrides_collection() {
    let (mut env, probe, sprite) = setup();
    let (pointer, wrapper, _) = bind_new(&mut env, sprite, ReferencePolicy::Reference);

    assert!(env.mark_persistent(pointer));
    assert!(env.mark_persistent(pointer));
    assert!(env.is_persistent(pointer));
    assert!(!env.unwrap().is_weak(wrapper));

    env.runtime_mut().release(wrapper);
    for _ in 0..3 {
        env.gc();
        assert!(!env.on_reference_request(pointer, false));
        assert!(env.check_object(pointer));
    }

    assert!(env.unbind_pointer(pointer));
    assert!(!env.is_persistent(pointer));
    assert!(env.on_reference_request(pointer, false));
    assert!(!probe.is_destroyed(pointer));
}

#[test]
fn test_mark_persistent_requires_binding() {
    let (mut env, _, _) = setup();
    let pointer = env.host_mut().spawn(true);
    assert!(!env.mark_persistent(pointer));
    assert!(!env.is_persistent(pointer));
}

#[test]
fn test_shutdown_sweep_releases_every_binding_once() {
    const N: usize = 64;
    let (mut env, probe, sprite) = setup();
    env.runtime_mut().set_deliver_finalizers(false);

    let bound: Vec<_> = (0..N)
        .map(|_| bind_new(&mut env, sprite, ReferencePolicy::Reference))
        .collect();
    for (_, wrapper, _) in &bound {
        env.runtime_mut().release(*wrapper);
    }
    env.gc();
    env.update_with_elapsed(Duration::from_millis(16));
    assert_eq!(env.objects().bound_count(), N);

    drop(env);

    assert_eq!(probe.bridge_references(), N as u64);
    assert_eq!(probe.bridge_unreferences(), N as u64);
    assert_eq!(probe.destroyed(), N as u64);
    assert_eq!(probe.double_frees(), 0);
    assert_eq!(probe.live(), 0);
}

#[test]
fn test_shutdown_sweep_over_sparse_slots() {
    const N: usize = 20_000;
    let (mut env, probe, sprite) = setup();

    let bound: Vec<_> = (0..N)
        .map(|_| bind_new(&mut env, sprite, ReferencePolicy::ReferenceAlways))
        .collect();
    // free the leading half so the survivors sit behind a run of empty slots
    for (pointer, _, _) in &bound[..N / 2] {
        env.unbind_pointer(*pointer);
    }

    let start = std::time::Instant::now();
    env.shutdown();
    let elapsed = start.elapsed();

    assert!(env.is_torn_down());
    assert!(env.objects().is_empty());
    assert_eq!(env.counters().unbound, N as u64);
    assert_eq!(probe.bridge_unreferences(), (N / 2) as u64);
    assert_eq!(probe.destroyed(), (N / 2) as u64);
    assert!(elapsed < std::time::Duration::from_secs(5), "sweep took {elapsed:?}");
}

#[test]
fn test_collector_and_sweep_split_the_work() {
    let (mut env, probe, sprite) = setup();
    let bound: Vec<_> = (0..20)
        .map(|_| bind_new(&mut env, sprite, ReferencePolicy::Reference))
        .collect();

    for (_, wrapper, _) in bound.iter().step_by(2) {
        env.runtime_mut().release(*wrapper);
    }
    env.gc();
    assert_eq!(env.counters().finalized, 10);
    assert_eq!(env.objects().bound_count(), 10);

    drop(env);
    assert_eq!(probe.bridge_unreferences(), 20);
    assert_eq!(probe.destroyed(), 20);
    assert_eq!(probe.double_frees(), 0);
}

#[test]
fn test_persistent_objects_survive_shutdown() {
    let (mut env, probe, sprite) = setup();
    let node = env.register_class(ClassKind::HostObject, "Node").unwrap();

    let scene_node = env.host_mut().spawn(false);
    let wrapper = env.runtime_mut().new_object();
    env.bind_pointer(node, scene_node, wrapper, ReferencePolicy::Reference).unwrap();
    env.mark_persistent(scene_node);
    let (resource, _, _) = bind_new(&mut env, sprite, ReferencePolicy::Reference);

    drop(env);

    // the scene tree owns the node; the resource belonged to script
    assert!(!probe.is_destroyed(scene_node));
    assert!(probe.is_destroyed(resource));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_every_binding_released_exactly_once(
        ops in prop::collection::vec((0u8..4, any::<bool>()), 1..80)
    ) {
        let (mut env, probe, sprite) = setup();
        let mut live: Vec<(NativePtr, SimObject)> = Vec::new();

        for (op, flag) in ops {
            match op {
                0 => {
                    let (pointer, wrapper, _) = bind_new(&mut env, sprite, ReferencePolicy::Reference);
                    live.push((pointer, wrapper));
                }
                1 => {
                    if let Some(&(_, wrapper)) = live.last() {
                        env.runtime_mut().release(wrapper);
                    }
                }
                2 => {
                    env.runtime_mut().set_deliver_finalizers(flag);
                    env.gc();
                }
                _ => {
                    if let Some(&(pointer, _)) = live.first() {
                        if flag {
                            env.mark_persistent(pointer);
                        }
                    }
                }
            }
            prop_assert!(env.objects().is_consistent());
        }

        let bound = live.len() as u64;
        drop(env);
        prop_assert_eq!(probe.bridge_references(), bound);
        prop_assert_eq!(probe.bridge_unreferences(), bound);
        prop_assert_eq!(probe.double_frees(), 0);
    }
}
