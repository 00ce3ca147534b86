mod common;

use background_locator_core::keys;
use background_locator_core::{
    BackgroundLocator, LocationClient, PreferenceStore, ServiceCollaborators, ServiceIntent,
    SledPreferences, StartResult,
};
use common::{FakeHost, FakeWakeLock, ManualBackends, RecordingNotifications};
use std::sync::Arc;

fn locator_over(preferences: Arc<SledPreferences>, backends: ManualBackends) -> BackgroundLocator {
    let (locator, _main_loop) = BackgroundLocator::new(ServiceCollaborators {
        preferences,
        notifications: Arc::new(RecordingNotifications::default()),
        wake_lock: Arc::new(FakeWakeLock::default()),
        host: Arc::new(FakeHost::default()),
        backends: Arc::new(backends),
    });
    locator
}

#[test]
fn test_preferences_persist_across_restarts() {
    let dir = tempfile::tempdir().unwrap();

    // First instance: select a backend and register the callback
    {
        let prefs = SledPreferences::open(dir.path()).unwrap();
        prefs.set_location_client(LocationClient::Platform).unwrap();
        prefs
            .set_callback_handle(keys::CALLBACK_HANDLE_KEY, 77)
            .unwrap();
        prefs.set_service_running(true).unwrap();
    }

    // Second instance: values survived
    {
        let prefs = SledPreferences::open(dir.path()).unwrap();
        assert_eq!(prefs.location_client(), LocationClient::Platform);
        assert_eq!(prefs.callback_handle(keys::CALLBACK_HANDLE_KEY), Some(77));
        assert!(prefs.is_service_running());
    }
}

#[test]
fn test_stale_running_flag_survives_process_death() {
    let dir = tempfile::tempdir().unwrap();

    // Process killed while running: the flag is never cleared
    {
        let prefs = Arc::new(SledPreferences::open(dir.path()).unwrap());
        let backends = ManualBackends::default();
        let locator = locator_over(prefs, backends.clone());
        locator
            .service()
            .on_start_command(Some(&ServiceIntent::start()));
        assert_eq!(backends.active_count(), 1);
    }

    let prefs = Arc::new(SledPreferences::open(dir.path()).unwrap());
    assert!(prefs.is_service_running());

    let backends = ManualBackends::default();
    let locator = locator_over(prefs.clone(), backends.clone());
    let service = locator.service();

    // START is ignored until an explicit shutdown clears the flag
    assert_eq!(
        service.on_start_command(Some(&ServiceIntent::start())),
        StartResult::ContinueRunning
    );
    assert_eq!(backends.created(), 0);

    service.on_start_command(Some(&ServiceIntent::shutdown()));
    assert!(!prefs.is_service_running());

    service.on_start_command(Some(&ServiceIntent::start()));
    assert_eq!(backends.active_count(), 1);
}

#[test]
fn test_provider_choice_read_at_start() {
    let dir = tempfile::tempdir().unwrap();
    let prefs = Arc::new(SledPreferences::open(dir.path()).unwrap());
    prefs.set_location_client(LocationClient::Platform).unwrap();

    let backends = ManualBackends::default();
    let locator = locator_over(prefs, backends.clone());
    locator
        .service()
        .on_start_command(Some(&ServiceIntent::start()));

    assert_eq!(locator.service().active_client(), Some(LocationClient::Platform));
    assert_eq!(
        backends.subscriptions.lock()[0].client,
        LocationClient::Platform
    );
}
