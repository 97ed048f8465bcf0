use std::{error::Error, path::Path};

use test_utils::check_failing_run;

#[test]
fn over_application_is_a_runtime_error() -> Result<(), Box<dyn Error>> {
    check_failing_run(Path::new("./tests/fixtures/over_application.scr"))
}

#[test]
fn accessing_an_unimported_module_is_a_runtime_error() -> Result<(), Box<dyn Error>> {
    check_failing_run(Path::new("./tests/fixtures/unknown_import.scr"))
}

#[test]
fn indexing_a_non_list_is_a_runtime_error() -> Result<(), Box<dyn Error>> {
    check_failing_run(Path::new("./tests/fixtures/index_non_list.scr"))
}
