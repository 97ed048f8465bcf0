use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./tests/fixtures/arithmetic.scr";
const EXPECTED: Expected = Expected {
    stdout: "7\n",
    stderr: "",
};

#[test]
fn respects_multiplicative_precedence() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
