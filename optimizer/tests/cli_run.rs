//! CLI tests that spawn the optimizer binary.
//!
//! Only paths that never reach a model provider are exercised here.

use std::fs;
use std::process::Command;

use optimizer::exit_codes;

#[test]
fn zero_steps_completes_without_contacting_provider() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("hello.sh"), "echo hello\n").expect("write program");
    fs::write(
        temp.path().join("optimizer.toml"),
        "interpreter = [\"sh\"]\nlanguage = \"POSIX shell\"\n",
    )
    .expect("write config");

    let output = Command::new(env!("CARGO_BIN_EXE_optimizer"))
        .current_dir(temp.path())
        .env_remove("RUST_LOG")
        .args([
            "--program",
            "hello.sh",
            "--model",
            "ollama",
            "--model_name",
            "llama3",
            "--steps",
            "0",
        ])
        .output()
        .expect("run optimizer");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(exit_codes::OK), "{stdout}");
    assert!(stdout.contains("Iteration Initial: Execution Time:"), "{stdout}");
    assert!(stdout.contains("No qualifying iterations"), "{stdout}");
    assert!(temp.path().join("run").join("exp0001").is_dir());
}

#[test]
fn missing_credentials_fail_before_baseline() {
    let temp = tempfile::tempdir().expect("tempdir");
    fs::write(temp.path().join("hello.sh"), "echo hello\n").expect("write program");

    let output = Command::new(env!("CARGO_BIN_EXE_optimizer"))
        .current_dir(temp.path())
        .env_remove("OPENAI_API_KEY")
        .args([
            "--program",
            "hello.sh",
            "--model",
            "openai",
            "--model_name",
            "gpt-4o",
        ])
        .output()
        .expect("run optimizer");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("OPENAI_API_KEY"));
    assert!(!temp.path().join("run").exists());
}
