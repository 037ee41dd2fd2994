#[cfg(test)]
mod tests {
    use super::super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_default_recipe_is_the_dislib_image() {
        let recipe = Recipe::default();
        assert_eq!(recipe.name, "dislib");
        assert_eq!(recipe.base_image, "bscwdc/dislib-base:latest");
        assert_eq!(recipe.platform, "linux/amd64");
        assert_eq!(recipe.source.path, PathBuf::from("."));
        assert_eq!(recipe.source.dest, "/dislib");
        assert_eq!(recipe.env.len(), 3);
        assert!(recipe.install.enabled);
        assert_eq!(recipe.install.requirements, PathBuf::from("requirements.txt"));
        assert_eq!(recipe.edits.len(), 1);
        assert_eq!(
            recipe.edits[0].path,
            "/opt/COMPSs/Runtime/configuration/xml/resources/default_resources.xml"
        );
        assert_eq!(recipe.edits[0].substitute.len(), 2);
        assert_eq!(recipe.expose, vec!["22"]);
        assert_eq!(recipe.cmd, vec!["/usr/sbin/sshd", "-D"]);
    }

    #[test]
    fn test_defaults_survive_a_roundtrip() {
        let recipe = Recipe::default();
        let serialized = toml::to_string(&recipe).unwrap();
        let parsed: Recipe = toml::from_str(&serialized).unwrap();
        assert_eq!(recipe, parsed);
    }

    #[test]
    fn test_empty_file_yields_defaults() {
        let recipe: Recipe = toml::from_str("").unwrap();
        assert_eq!(recipe, Recipe::default());
    }

    #[test]
    fn test_load_without_recipe_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let recipe = Recipe::load(dir.path(), None).unwrap();
        assert_eq!(recipe, Recipe::default());
    }

    #[test]
    fn test_load_picks_up_context_recipe() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join(RECIPE_FILE_NAME),
            r#"base_image = "bscwdc/dislib-base:0.4""#,
        )
        .unwrap();

        let recipe = Recipe::load(dir.path(), None).unwrap();
        assert_eq!(recipe.base_image, "bscwdc/dislib-base:0.4");
        // untouched fields still default
        assert_eq!(recipe.cmd, vec!["/usr/sbin/sshd", "-D"]);
    }

    #[test]
    fn test_load_explicit_missing_file_fails() {
        let dir = tempdir().unwrap();
        let result = Recipe::load(dir.path(), Some(&dir.path().join("nope.toml")));
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read recipe file"));
    }

    #[test]
    fn test_parse_full_recipe() {
        let recipe: Recipe = toml::from_str(
            r#"
name = "myimage"
base_image = "example.com/base:1.0"
expose = ["22", "8080/udp"]
cmd = ["/usr/sbin/sshd", "-D"]

[source]
path = "lib"
dest = "/app"

[[env]]
action = "append"
name = "PYTHONPATH"
value = "/app"

[[env]]
action = "set"
name = "LC_ALL"
value = "C.UTF-8"

[install]
enabled = false

[[edits]]
path = "/etc/service/config.xml"
on_missing = "error"

[[edits.substitute]]
find = ">4<"
replace = ">16<"
"#,
        )
        .unwrap();

        assert_eq!(recipe.name, "myimage");
        assert!(!recipe.install.enabled);
        assert_eq!(
            recipe.env[0],
            EnvDirective::Append {
                name: "PYTHONPATH".to_string(),
                value: "/app".to_string(),
                separator: ":".to_string(),
            }
        );
        assert_eq!(recipe.edits[0].on_missing, MissingPolicy::Error);
        assert_eq!(recipe.edits[0].substitute[0].find, ">4<");
        assert_eq!(recipe.expose, vec!["22", "8080/udp"]);
    }

    #[test]
    fn test_validate_default_recipe() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "scipy>=1.0\n").unwrap();
        Recipe::default().validate(dir.path()).unwrap();
    }

    #[test]
    fn test_validate_missing_requirements() {
        let dir = tempdir().unwrap();
        let result = Recipe::default().validate(dir.path());
        assert!(result.is_err());
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Dependency manifest not found"));
    }

    #[test]
    fn test_validate_missing_source_tree() {
        let dir = tempdir().unwrap();
        let mut recipe = Recipe::default();
        recipe.source.path = PathBuf::from("src-that-does-not-exist");
        let result = recipe.validate(dir.path());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Source tree not found"));
    }

    #[test]
    fn test_validate_relative_edit_path() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "scipy\n").unwrap();
        let mut recipe = Recipe::default();
        recipe.edits[0].path = "opt/conf.xml".to_string();
        assert!(recipe.validate(dir.path()).is_err());
    }

    #[test]
    fn test_validate_bad_port() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("requirements.txt"), "scipy\n").unwrap();
        let mut recipe = Recipe::default();
        recipe.expose = vec!["ssh".to_string()];
        assert!(recipe.validate(dir.path()).is_err());

        recipe.expose = vec!["22/icmp".to_string()];
        assert!(recipe.validate(dir.path()).is_err());
    }

    #[test]
    fn test_parse_port_forms() {
        assert_eq!(parse_port("22").unwrap(), 22);
        assert_eq!(parse_port("8080/udp").unwrap(), 8080);
        assert!(parse_port("70000").is_err());
    }
}
