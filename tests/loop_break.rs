use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./tests/fixtures/loop_break.scr";
const EXPECTED: Expected = Expected {
    stdout: "3\n",
    stderr: "",
};

#[test]
fn loop_stops_at_break() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
