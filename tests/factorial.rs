use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./tests/fixtures/factorial.scr";
const EXPECTED: Expected = Expected {
    stdout: "120\n",
    stderr: "",
};

#[test]
fn recursive_factorial() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
