use std::{
    error::Error,
    io,
    path::Path,
    process::{Command, Output},
    str,
};

const LUMEN_PATH: &str = "./target/debug/lumen";

pub struct Expected<'a> {
    pub stdout: &'a str,
    pub stderr: &'a str,
}

impl<'a> Expected<'a> {
    fn assert_matches(self, output: &Output) -> Result<(), Box<dyn Error>> {
        assert_eq!(str::from_utf8(&output.stdout)?, self.stdout);
        assert_eq!(str::from_utf8(&output.stderr)?, self.stderr);
        Ok(())
    }
}

/// Runs with the current directory set to `src_path`'s parent, since
/// sibling `import` lookups resolve relative to the process working
/// directory rather than the invoked script's own path.
fn run_lumen(src_path: &Path) -> Result<Output, io::Error> {
    let dir = src_path.parent().unwrap_or_else(|| Path::new("."));
    let file = src_path.file_name().expect("src_path must name a file");
    Command::new(abs_lumen_path()).current_dir(dir).arg(file).output()
}

fn abs_lumen_path() -> std::path::PathBuf {
    std::env::current_dir()
        .expect("current dir")
        .join(LUMEN_PATH)
}

/// Runs a `.scr` fixture through the `lumen` binary and asserts its
/// stdout/stderr and that it exited successfully.
pub fn check_run(src_path: &Path, expected: Expected) -> Result<(), Box<dyn Error>> {
    let output = run_lumen(src_path)?;

    expected.assert_matches(&output)?;
    assert!(
        output.status.success(),
        "lumen exited with status {:?}",
        output.status.code()
    );

    Ok(())
}

/// Runs a `.scr` fixture expected to fail (lex/parse/runtime error) and
/// asserts a non-zero exit code.
pub fn check_failing_run(src_path: &Path) -> Result<(), Box<dyn Error>> {
    let output = run_lumen(src_path)?;

    println!("{output:?}");
    assert!(
        !output.status.success(),
        "lumen should have exited with a non-zero status"
    );

    Ok(())
}
