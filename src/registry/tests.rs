#[cfg(test)]
mod tests {
    use super::super::*;

    #[test]
    fn test_parse_image_reference() {
        let (registry, repo, tag) =
            parse_image_reference("docker.io/bscwdc/dislib-base:latest").unwrap();
        assert_eq!(registry, "docker.io");
        assert_eq!(repo, "bscwdc/dislib-base");
        assert_eq!(tag, "latest");
    }

    #[test]
    fn test_parse_image_reference_no_tag() {
        let (_, _, tag) = parse_image_reference("docker.io/bscwdc/dislib-base").unwrap();
        assert_eq!(tag, "latest");
    }

    #[test]
    fn test_parse_image_reference_with_port() {
        let (registry, repo, tag) = parse_image_reference("localhost:5000/dislib:v1.0").unwrap();
        assert_eq!(registry, "localhost:5000");
        assert_eq!(repo, "dislib");
        assert_eq!(tag, "v1.0");
    }

    #[test]
    fn test_parse_platform() {
        assert_eq!(
            parse_platform("linux/amd64").unwrap(),
            ("linux".to_string(), "amd64".to_string())
        );
        assert!(parse_platform("invalid-platform").is_err());
        assert!(parse_platform("linux/").is_err());
    }

    #[test]
    fn test_client_for_platform() {
        assert!(RegistryClient::new("linux/amd64").is_ok());
        assert!(RegistryClient::new("nonsense").is_err());
    }
}
