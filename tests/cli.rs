use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use tempfile::TempDir;

const CORPUS: &str = "Hello there! Can you assist me with my code?\n\
Sure, here it is: ```python\ndef hello():\n    print(\"Hello, World!\")\n```\n\
The last line `hello()` calls the function. See [docs](https://example.com).\n\
Hello there! Have a great day!\n";

fn temp_workspace() -> TempDir {
    tempfile::tempdir().expect("create tempdir")
}

fn sbpe(workspace: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("sbpe").expect("binary exists");
    cmd.current_dir(workspace.path()).arg("--quiet");
    cmd
}

fn train_model(workspace: &TempDir) {
    fs::write(workspace.path().join("corpus.txt"), CORPUS).expect("write corpus");
    sbpe(workspace)
        .args([
            "train",
            "corpus.txt",
            "--vocab-size",
            "300",
            "--no-progress",
            "-o",
            "tokenizer.json",
        ])
        .assert()
        .success();
    assert!(workspace.path().join("tokenizer.json").exists());
}

#[test]
fn train_encode_decode_round_trip() {
    let workspace = temp_workspace();
    train_model(&workspace);

    let encode_output = sbpe(&workspace)
        .args(["encode", "-m", "tokenizer.json", "corpus.txt", "--json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let encoded: Value =
        serde_json::from_slice(&encode_output).expect("encoded output is valid JSON");
    let tokens = encoded["tokens"]
        .as_array()
        .expect("tokens array")
        .iter()
        .map(|v| v.as_u64().expect("u64 token").to_string())
        .collect::<Vec<_>>();
    assert!(!tokens.is_empty());
    assert!(tokens.len() < CORPUS.len(), "merges shorten the encoding");

    let mut args = vec![
        "decode".to_string(),
        "-m".to_string(),
        "tokenizer.json".to_string(),
        "--output".to_string(),
        "decoded.txt".to_string(),
    ];
    args.extend(tokens);
    sbpe(&workspace).args(args).assert().success();

    let decoded = fs::read_to_string(workspace.path().join("decoded.txt")).expect("read decoded");
    assert_eq!(decoded, CORPUS);
}

#[test]
fn encode_text_and_count() {
    let workspace = temp_workspace();
    train_model(&workspace);

    let ids = sbpe(&workspace)
        .args(["encode", "-m", "tokenizer.json", "--text", "Hello there!"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let ids = String::from_utf8(ids).expect("utf-8 output");
    let id_count = ids.split_whitespace().count();
    assert!(id_count > 0);

    let count = sbpe(&workspace)
        .args(["encode", "-m", "tokenizer.json", "--text", "Hello there!", "--count"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let count: usize = String::from_utf8(count)
        .expect("utf-8 output")
        .trim()
        .parse()
        .expect("numeric count");
    assert_eq!(count, id_count);

    let decoded = sbpe(&workspace)
        .args(["decode", "-m", "tokenizer.json"])
        .args(ids.split_whitespace())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    assert_eq!(decoded, b"Hello there!");
}

#[test]
fn validate_and_info_report_on_the_model() {
    let workspace = temp_workspace();
    train_model(&workspace);
    fs::write(
        workspace.path().join("samples.txt"),
        "ünïcødé survives\nso do emoji 🎉\n",
    )
    .expect("write samples");

    sbpe(&workspace)
        .args(["validate", "-m", "tokenizer.json", "--samples", "samples.txt"])
        .assert()
        .success();

    let info_output = sbpe(&workspace)
        .args(["info", "-m", "tokenizer.json", "--json", "--show-tokens", "3"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let info: Value = serde_json::from_slice(&info_output).expect("info output is valid JSON");
    let vocab_size = info["vocab_size"].as_u64().expect("vocab size");
    assert!(vocab_size > 256 && vocab_size <= 300);
    assert_eq!(info["merged_tokens"].as_u64(), Some(vocab_size - 256));
    assert_eq!(info["default_pattern"], true);
    assert_eq!(info["tokens"].as_array().expect("tokens").len(), 3);

    let text = sbpe(&workspace)
        .args(["info", "-m", "tokenizer.json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let text = String::from_utf8(text).expect("info output is UTF-8");
    assert!(text.contains("Vocab size"));
}

#[test]
fn train_refuses_to_write_a_model_that_drops_text() {
    let workspace = temp_workspace();
    fs::write(workspace.path().join("corpus.txt"), CORPUS).expect("write corpus");
    // "." never matches newlines, so multi-line samples cannot round trip.
    sbpe(&workspace)
        .args([
            "train",
            "corpus.txt",
            "--vocab-size",
            "260",
            "--pattern",
            ".",
            "--no-progress",
            "-o",
            "tokenizer.json",
        ])
        .assert()
        .failure();
    assert!(!workspace.path().join("tokenizer.json").exists());
}

#[test]
fn missing_model_and_small_vocab_fail() {
    let workspace = temp_workspace();
    sbpe(&workspace)
        .args(["encode", "-m", "absent.json", "--text", "hi"])
        .assert()
        .failure();

    fs::write(workspace.path().join("corpus.txt"), CORPUS).expect("write corpus");
    sbpe(&workspace)
        .args(["train", "corpus.txt", "--vocab-size", "100", "--no-progress"])
        .assert()
        .failure();
}
