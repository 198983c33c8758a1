//! Integration tests entry point for REST Workbench
//!
//! Lets the test harness discover the suites under `tests/integration/`.

mod integration;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integration_tests_module_loads() {
        integration::init_test_env();
        let fixture = integration::Fixture::new();
        assert!(fixture.workbench.environment(&fixture.environment.id).is_some());
    }
}
