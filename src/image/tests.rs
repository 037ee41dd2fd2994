#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_lookup_env() {
        let env = vec![
            "PATH=/usr/bin".to_string(),
            "PYTHONPATH=/opt/COMPSs/Bindings/python".to_string(),
        ];
        assert_eq!(lookup_env(&env, "PATH"), Some("/usr/bin"));
        assert_eq!(
            lookup_env(&env, "PYTHONPATH"),
            Some("/opt/COMPSs/Bindings/python")
        );
        assert_eq!(lookup_env(&env, "LC_ALL"), None);
    }

    #[test]
    fn test_set_env_replaces_existing() {
        let mut env = vec!["LC_ALL=POSIX".to_string(), "PATH=/usr/bin".to_string()];
        set_env(&mut env, "LC_ALL", "C.UTF-8");
        assert_eq!(env, vec!["LC_ALL=C.UTF-8", "PATH=/usr/bin"]);
    }

    #[test]
    fn test_set_env_appends_missing() {
        let mut env = vec!["PATH=/usr/bin".to_string()];
        set_env(&mut env, "COMPSS_LOAD_SOURCE", "false");
        assert_eq!(env, vec!["PATH=/usr/bin", "COMPSS_LOAD_SOURCE=false"]);
    }

    #[test]
    fn test_append_env_with_existing_value() {
        let mut env = vec!["PYTHONPATH=/opt/COMPSs/Bindings/python".to_string()];
        append_env(&mut env, "PYTHONPATH", "/dislib", ":");
        assert_eq!(env, vec!["PYTHONPATH=/opt/COMPSs/Bindings/python:/dislib"]);
    }

    #[test]
    fn test_append_env_unset_takes_bare_value() {
        let mut env = vec!["PATH=/usr/bin".to_string()];
        append_env(&mut env, "PYTHONPATH", "/dislib", ":");
        assert_eq!(env, vec!["PATH=/usr/bin", "PYTHONPATH=/dislib"]);
    }

    #[test]
    fn test_append_env_empty_takes_bare_value() {
        let mut env = vec!["PYTHONPATH=".to_string()];
        append_env(&mut env, "PYTHONPATH", "/dislib", ":");
        assert_eq!(env, vec!["PYTHONPATH=/dislib"]);
    }

    #[test]
    fn test_expose_port_normalizes_bare_port() {
        let mut ports = None;
        expose_port(&mut ports, "22");
        let ports = ports.unwrap();
        assert_eq!(ports.len(), 1);
        assert!(ports.contains_key("22/tcp"));
    }

    #[test]
    fn test_expose_port_keeps_protocol_suffix() {
        let mut ports = None;
        expose_port(&mut ports, "8080/udp");
        assert!(ports.unwrap().contains_key("8080/udp"));
    }

    #[test]
    fn test_config_roundtrip_preserves_unknown_fields() {
        let raw = r#"{
            "architecture": "amd64",
            "os": "linux",
            "created": "2019-04-01T10:00:00Z",
            "docker_version": "18.09.2",
            "config": {
                "Env": ["PATH=/usr/bin"],
                "Cmd": ["/bin/bash"],
                "Labels": {"maintainer": "support-compss@bsc.es"}
            },
            "rootfs": {
                "type": "layers",
                "diff_ids": ["sha256:aaaa"]
            }
        }"#;

        let config: ImageConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.architecture, "amd64");
        assert_eq!(config.extra["docker_version"], "18.09.2");
        assert_eq!(config.config.extra["Labels"]["maintainer"], "support-compss@bsc.es");

        let out = serde_json::to_value(&config).unwrap();
        assert_eq!(out["created"], "2019-04-01T10:00:00Z");
        assert_eq!(out["config"]["Labels"]["maintainer"], "support-compss@bsc.es");
        assert_eq!(out["rootfs"]["diff_ids"][0], "sha256:aaaa");
    }

    #[test]
    fn test_history_entry_without_optional_fields() {
        let raw = r#"{"created": "2019-04-01T10:00:00Z"}"#;
        let entry: History = serde_json::from_str(raw).unwrap();
        assert!(entry.created_by.is_empty());
        assert!(!entry.empty_layer);
    }
}
