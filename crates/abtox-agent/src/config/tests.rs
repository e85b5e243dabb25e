#[cfg(test)]
mod tests {
    use super::super::*;
    use std::io::Write;

    #[test]
    fn test_overrides_take_precedence() {
        let mut cfg = RunConfig::default();
        let overrides = Overrides {
            query: Some("bispecific".into()),
            page_size: Some(25),
            max_pages: Some(3),
            output_dir: Some(PathBuf::from("out")),
            fetch_details: true,
        };
        overrides.apply(&mut cfg);
        assert_eq!(cfg.registry.query_term, "bispecific");
        assert_eq!(cfg.registry.page_size, 25);
        assert_eq!(cfg.registry.max_pages, Some(3));
        assert_eq!(cfg.output.dir, "out");
        assert!(cfg.registry.fetch_details);
    }

    #[test]
    fn test_empty_overrides_keep_file_values() {
        let mut cfg = RunConfig::default();
        cfg.registry.page_size = 50;
        Overrides::default().apply(&mut cfg);
        assert_eq!(cfg.registry.page_size, 50);
        assert!(!cfg.registry.fetch_details);
    }

    #[test]
    fn test_explicit_file_loaded_and_overridden() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[registry]\nquery_term = \"adc\"\npage_size = 10").unwrap();

        let overrides = Overrides { page_size: Some(20), ..Overrides::default() };
        let (cfg, source) = load(Some(file.path()), &overrides).unwrap();
        assert_eq!(cfg.registry.query_term, "adc");
        assert_eq!(cfg.registry.page_size, 20);
        assert_eq!(source.as_deref(), Some(file.path()));
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let missing = std::path::Path::new("/nonexistent/abtox.toml");
        assert!(load(Some(missing), &Overrides::default()).is_err());
    }

    #[test]
    fn test_invalid_override_rejected() {
        let file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        let overrides = Overrides { page_size: Some(0), ..Overrides::default() };
        assert!(load(Some(file.path()), &overrides).is_err());
    }
}
