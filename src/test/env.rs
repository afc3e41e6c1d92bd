#[cfg(test)]
mod tests {
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_load_environment_skips_missing_files() {
        temp_env::with_var("ROCKET_PROFILE", Some("development"), || {
            assert!(crate::env::load_environment().is_ok());
        });
    }

    #[test]
    #[serial]
    fn test_load_environment_production_profile() {
        temp_env::with_var("ROCKET_PROFILE", Some("production"), || {
            assert!(crate::env::load_environment().is_ok());
        });
    }
}
