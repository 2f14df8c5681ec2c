mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use common::{MockMappingService, mapping_response};
use mdspec::ai::ColumnMappingService;
use mdspec::byok::{ByokCacheConfig, ByokServiceCache, ServiceFactory};

fn counting_factory(counter: Arc<AtomicUsize>) -> Box<ServiceFactory> {
    Box::new(move |_key: &str| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(MockMappingService::with_response(mapping_response(&[])))
            as Arc<dyn ColumnMappingService>)
    })
}

#[test]
fn two_keys_mean_two_instances_and_one_factory_call_each() {
    let counter = Arc::new(AtomicUsize::new(0));
    let cache = ByokServiceCache::new(
        ByokCacheConfig::default(),
        counting_factory(Arc::clone(&counter)),
    );

    let first_a = cache.get_or_create("key-alpha").expect("service");
    let first_b = cache.get_or_create("key-beta").expect("service");
    let second_a = cache.get_or_create("key-alpha").expect("service");
    let second_b = cache.get_or_create("key-beta").expect("service");

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(Arc::ptr_eq(&first_a, &second_a));
    assert!(Arc::ptr_eq(&first_b, &second_b));
    assert!(!Arc::ptr_eq(&first_a, &first_b));
    assert_eq!(cache.size(), 2);
    cache.close();
}

#[test]
fn close_drops_all_entries() {
    let counter = Arc::new(AtomicUsize::new(0));
    let cache = ByokServiceCache::new(
        ByokCacheConfig::default(),
        counting_factory(Arc::clone(&counter)),
    );
    cache.get_or_create("key").expect("service");
    assert_eq!(cache.size(), 1);
    cache.close();
}

#[test]
fn expired_keys_are_recreated_after_the_ttl() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = ByokCacheConfig {
        ttl: Duration::from_millis(40),
        cleanup_interval: Duration::from_secs(60),
        max_entries: 8,
    };
    let cache = ByokServiceCache::new(config, counting_factory(Arc::clone(&counter)));

    let first = cache.get_or_create("key").expect("service");
    std::thread::sleep(Duration::from_millis(70));
    let second = cache.get_or_create("key").expect("service");

    assert_eq!(counter.load(Ordering::SeqCst), 2);
    assert!(!Arc::ptr_eq(&first, &second));
    cache.close();
}
