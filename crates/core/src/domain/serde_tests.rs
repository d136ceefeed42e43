#[cfg(test)]
mod tests {
    use crate::domain::config::PathConfig;
    use crate::domain::error::{AppError, ErrorCode};
    use crate::domain::job::{RequestKind, RequestStatus};
    use crate::domain::preset::Preset;
    use crate::domain::settings::FlowPathSettings;
    use crate::domain::state::WidgetState;
    use crate::domain::theme::builtin_theme;
    use crate::domain::types::{LoraPathFormat, OutputMode, Segment, SegmentType};

    #[test]
    fn test_segment_type_serialization() {
        assert_eq!(
            serde_json::to_string(&SegmentType::FileType).unwrap(),
            "\"file_type\""
        );
        assert_eq!(
            serde_json::to_string(&SegmentType::ContentRating).unwrap(),
            "\"content_rating\""
        );
        assert_eq!(
            serde_json::from_str::<SegmentType>("\"lora\"").unwrap(),
            SegmentType::Lora
        );
        assert!(serde_json::from_str::<SegmentType>("\"output_label\"").is_err());
    }

    #[test]
    fn test_segment_wire_format() {
        let json = serde_json::to_string(&Segment::new(SegmentType::Name)).unwrap();
        assert_eq!(json, r#"{"type":"name","enabled":true}"#);

        let json = serde_json::to_string(&Segment::custom("{model}")).unwrap();
        assert_eq!(json, r#"{"type":"custom","enabled":true,"value":"{model}"}"#);
    }

    #[test]
    fn test_segment_enabled_defaults_true() {
        let seg: Segment = serde_json::from_str(r#"{"type":"date"}"#).unwrap();
        assert!(seg.enabled);
        assert!(seg.value.is_none());
    }

    #[test]
    fn test_output_mode_serialization() {
        assert_eq!(
            serde_json::to_string(&OutputMode::SaveImage).unwrap(),
            "\"saveImage\""
        );
        assert_eq!(
            serde_json::to_string(&OutputMode::ImageSaver).unwrap(),
            "\"imageSaver\""
        );
    }

    #[test]
    fn test_lora_path_format_serialization() {
        assert_eq!(
            serde_json::to_string(&LoraPathFormat::PrimaryCount).unwrap(),
            "\"primaryCount\""
        );
        assert_eq!(
            serde_json::from_str::<LoraPathFormat>("\"separate\"").unwrap(),
            LoraPathFormat::Separate
        );
    }

    #[test]
    fn test_error_code_serialization() {
        assert_eq!(
            serde_json::to_string(&ErrorCode::ProtectedPreset).unwrap(),
            "\"E_PROTECTED_PRESET\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::InvalidState).unwrap(),
            "\"E_INVALID_STATE\""
        );
        assert_eq!(
            serde_json::to_string(&ErrorCode::NotFound).unwrap(),
            "\"E_NOT_FOUND\""
        );
    }

    #[test]
    fn test_app_error_serialization() {
        let err = AppError::protected_preset("Simple Daily");
        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("E_PROTECTED_PRESET"));
        assert!(json.contains("Simple Daily"));
        assert!(json.contains("recoverable"));
    }

    #[test]
    fn test_config_wire_keys() {
        let value = serde_json::to_value(PathConfig::default()).unwrap();
        let obj = value.as_object().unwrap();
        assert_eq!(obj.len(), 13);
        assert_eq!(obj["output_mode"], "saveImage");
        assert_eq!(obj["date_format"], "%Y-%m-%d");
        assert!(!obj.contains_key("seed"));
    }

    #[test]
    fn test_preset_partial_config_roundtrip() {
        let json = r#"{"segments":[{"type":"name","enabled":false}],"config":{"category":"Locations"}}"#;
        let preset: Preset = serde_json::from_str(json).unwrap();
        assert_eq!(preset.config.category.as_deref(), Some("Locations"));
        assert!(preset.config.output_mode.is_none());
        assert_eq!(serde_json::to_string(&preset).unwrap(), json);
    }

    #[test]
    fn test_widget_state_key_names() {
        let state = WidgetState {
            active_preset_name: Some("Mine".into()),
            ..Default::default()
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["activePresetName"], "Mine");
        assert!(value.get("active_preset_name").is_none());

        let value = serde_json::to_value(WidgetState::default()).unwrap();
        assert!(value["activePresetName"].is_null());
    }

    #[test]
    fn test_settings_roundtrip() {
        let settings = FlowPathSettings {
            theme: "odie".into(),
            lora_path_format: LoraPathFormat::All,
            ..Default::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        assert!(json.contains("\"auto_detect_model\":\"manual\""));
        let back: FlowPathSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }

    #[test]
    fn test_theme_camel_case_keys() {
        let value = serde_json::to_value(builtin_theme("forest").unwrap()).unwrap();
        assert_eq!(value["primaryLight"], "rgba(16, 185, 129, 0.3)");
        assert!(value.get("primary_light").is_none());
    }

    #[test]
    fn test_request_enums() {
        assert_eq!(
            serde_json::to_string(&RequestKind::CreateFolder).unwrap(),
            "\"create_folder\""
        );
        assert_eq!(
            serde_json::to_string(&RequestStatus::Canceled).unwrap(),
            "\"canceled\""
        );
    }
}
