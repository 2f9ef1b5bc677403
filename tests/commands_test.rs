#[cfg(test)]
mod commands_tests {
    use webcam_capture::commands::CaptureState;
    use webcam_capture::testing::{MemorySaver, ScriptedRecorderFactory, SyntheticMediaSource};
    use webcam_capture::{CaptureConfig, CaptureController, CaptureError, FacingMode, RecordingState};

    type TestState = CaptureState<SyntheticMediaSource, ScriptedRecorderFactory>;

    fn setup_state(factory: ScriptedRecorderFactory) -> (TestState, SyntheticMediaSource, MemorySaver) {
        let mut config = CaptureConfig::default();
        config.camera.width = 64;
        config.camera.height = 48;
        config.recording.finalize_timeout_ms = 100;

        let source = SyntheticMediaSource::with_default_devices();
        let saver = MemorySaver::new();
        let controller = CaptureController::new(config, source.clone(), factory);
        (TestState::new(controller, Box::new(saver.clone())), source, saver)
    }

    #[tokio::test]
    async fn test_enumerate_devices_lists_cameras_only() {
        let (state, _, _) = setup_state(ScriptedRecorderFactory::new());
        let devices = state.enumerate_devices().await;

        let labels: Vec<&str> = devices.iter().map(|d| d.label.as_str()).collect();
        assert_eq!(labels, vec!["Front Camera", "Back Camera"]);
    }

    #[tokio::test]
    async fn test_toggle_facing_rebinds_live_stream() {
        let (state, source, _) = setup_state(ScriptedRecorderFactory::new());

        let info = state.bind_stream().await.unwrap();
        assert_eq!(info.device_id, "cam-back");

        assert_eq!(state.toggle_facing().await.unwrap(), FacingMode::Front);
        let snapshot = state.session_state().await;
        assert_eq!(snapshot.stream.unwrap().device_id, "cam-front");
        assert_eq!(source.opened().len(), 2);
    }

    #[tokio::test]
    async fn test_toggle_facing_without_stream_does_not_bind() {
        let (state, source, _) = setup_state(ScriptedRecorderFactory::new());

        state.toggle_facing().await.unwrap();
        assert!(source.opened().is_empty());
        assert!(state.session_state().await.stream.is_none());
    }

    #[tokio::test]
    async fn test_select_unknown_device_reports_unavailable() {
        let (state, _, _) = setup_state(ScriptedRecorderFactory::new());
        state.bind_stream().await.unwrap();

        let err = state.select_device("missing".to_string()).await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));

        // the page keeps its preview and the earlier selection
        let snapshot = state.session_state().await;
        assert_eq!(snapshot.stream.unwrap().device_id, "cam-back");
        assert_eq!(snapshot.device_id, None);
        assert!(state.capture_still().await.unwrap().is_some());
        state.start_recording().await.unwrap();
    }

    #[tokio::test]
    async fn test_bind_stream_reports_permission_denied() {
        let source = SyntheticMediaSource::with_default_devices()
            .failing_open(CaptureError::PermissionDenied("user dismissed the prompt".to_string()));
        let controller = CaptureController::new(CaptureConfig::default(), source, ScriptedRecorderFactory::new());
        let state = TestState::new(controller, Box::new(MemorySaver::new()));

        let err = state.bind_stream().await.unwrap_err();
        assert!(matches!(err, CaptureError::PermissionDenied(_)));
        assert!(err.to_string().contains("user dismissed the prompt"));
        assert!(state.session_state().await.stream.is_none());
    }

    #[tokio::test]
    async fn test_recording_preview_leaves_chunks() {
        let factory = ScriptedRecorderFactory::new();
        let (state, _, _) = setup_state(factory.clone());
        state.bind_stream().await.unwrap();
        assert_eq!(state.recording_preview().await, None);

        state.start_recording().await.unwrap();
        factory.last_sink().unwrap().chunk(b"clip".to_vec());

        let preview = state.recording_preview().await.unwrap();
        assert_eq!(preview.mime_type, "video/webm");
        assert_eq!(preview.data_url, "data:video/webm;base64,Y2xpcA==");
        assert_eq!(state.session_state().await.recorded_chunks, 1);
    }

    #[tokio::test]
    async fn test_select_device_while_recording_defers_rebind() {
        let (state, source, _) = setup_state(ScriptedRecorderFactory::new());
        state.bind_stream().await.unwrap();
        state.start_recording().await.unwrap();

        let snapshot = state.select_device("cam-front".to_string()).await.unwrap();
        assert_eq!(snapshot.device_id.as_deref(), Some("cam-front"));
        assert_eq!(snapshot.stream.unwrap().device_id, "cam-back");
        assert_eq!(source.opened().len(), 1);
    }

    #[tokio::test]
    async fn test_capture_and_clear_still() {
        let (state, _, _) = setup_state(ScriptedRecorderFactory::new());
        assert!(state.capture_still().await.unwrap().is_none());

        state.bind_stream().await.unwrap();
        let still = state.capture_still().await.unwrap().unwrap();
        assert!(still.data_url.starts_with("data:image/jpeg;base64,"));
        assert_eq!((still.width, still.height), (64, 48));
        assert!(state.session_state().await.still_image.is_some());

        state.clear_still().await;
        assert!(state.session_state().await.still_image.is_none());
    }

    #[tokio::test]
    async fn test_record_and_download_flow() {
        let factory = ScriptedRecorderFactory::new().finalizing_with(b"trailing".to_vec());
        let (state, _, saver) = setup_state(factory.clone());
        state.bind_stream().await.unwrap();

        let recording_id = state.start_recording().await.unwrap();
        let sink = factory.last_sink().unwrap();
        assert_eq!(sink.recording_id().to_string(), recording_id);
        sink.chunk(b"first-".to_vec());

        let snapshot = state.stop_recording().await.unwrap();
        assert!(!snapshot.is_recording);

        let path = state.download_recording().await.unwrap();
        assert_eq!(path.as_deref(), Some("memory/react-webcam-stream-capture.webm"));

        let saved = saver.saved();
        assert_eq!(saved.len(), 1);
        assert_eq!(&saved[0].data[..], b"first-trailing");
        assert_eq!(saved[0].mime_type, "video/webm");

        let snapshot = state.session_state().await;
        assert_eq!(snapshot.recorded_chunks, 0);
        assert_eq!(snapshot.recording_state, RecordingState::Idle);
    }

    #[tokio::test]
    async fn test_download_without_recording() {
        let (state, _, saver) = setup_state(ScriptedRecorderFactory::new());
        assert_eq!(state.download_recording().await.unwrap(), None);
        assert!(saver.saved().is_empty());
    }

    #[tokio::test]
    async fn test_start_twice_creates_one_recorder() {
        let factory = ScriptedRecorderFactory::new();
        let (state, _, _) = setup_state(factory.clone());
        state.bind_stream().await.unwrap();

        state.start_recording().await.unwrap();
        let second = state.start_recording().await;
        assert_eq!(second, Err(CaptureError::AlreadyRecording));
        assert_eq!(factory.created(), 1);
    }

    #[tokio::test]
    async fn test_stop_without_recording() {
        let (state, _, _) = setup_state(ScriptedRecorderFactory::new());
        assert_eq!(state.stop_recording().await.unwrap_err(), CaptureError::NotRecording);
    }

    #[tokio::test]
    async fn test_discard_recording() {
        let factory = ScriptedRecorderFactory::new().finalizing_with(b"clip".to_vec());
        let (state, _, saver) = setup_state(factory);
        state.bind_stream().await.unwrap();
        state.start_recording().await.unwrap();
        state.stop_recording().await.unwrap();

        let snapshot = state.discard_recording().await;
        assert_eq!(snapshot.recorded_chunks, 0);
        assert_eq!(state.download_recording().await.unwrap(), None);
        assert!(saver.saved().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_serializes_for_page() {
        let (state, _, _) = setup_state(ScriptedRecorderFactory::new());
        state.enumerate_devices().await;
        let snapshot = state.session_state().await;

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["facing_mode"], "back");
        assert_eq!(json["recording_state"], "idle");
        assert_eq!(json["devices"][0]["id"], "cam-front");
    }
}
