use std::{error::Error, path::Path};

use test_utils::{check_run, Expected};

const SRC_PATH: &str = "./tests/fixtures/import_math.scr";
const EXPECTED: Expected = Expected {
    stdout: "4\n",
    stderr: "",
};

#[test]
fn imports_the_built_in_math_module() -> Result<(), Box<dyn Error>> {
    check_run(Path::new(SRC_PATH), EXPECTED)
}
