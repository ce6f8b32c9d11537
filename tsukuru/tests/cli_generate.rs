//! CLI tests for the `tsukuru` binary.
//!
//! Spawns the binary against a fixture project. Generator runs talk to a
//! one-shot HTTP stub on localhost so the real chat client is exercised.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::process::{Command, Output, Stdio};
use std::thread::{self, JoinHandle};

use serde_json::json;
use tsukuru::exit_codes;
use tsukuru::io::config::{ProjectPaths, TsukuruConfig, write_config};
use tsukuru::test_support::TestProject;

/// Serve `replies` to consecutive connections, returning the request bodies.
fn serve_chat(replies: Vec<serde_json::Value>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let url = format!(
        "http://{}/v1/chat/completions",
        listener.local_addr().expect("addr")
    );
    let handle = thread::spawn(move || {
        let mut bodies = Vec::new();
        for reply in replies {
            let (stream, _) = listener.accept().expect("accept");
            let mut reader = BufReader::new(stream.try_clone().expect("clone"));
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).expect("read header");
                let header = line.trim_end();
                if header.is_empty() {
                    break;
                }
                if let Some((name, value)) = header.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().expect("content length");
                    }
                }
            }
            let mut body = vec![0u8; content_length];
            reader.read_exact(&mut body).expect("read body");
            bodies.push(String::from_utf8(body).expect("utf8 body"));

            let payload = reply.to_string();
            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                payload.len(),
                payload
            )
            .expect("write response");
        }
        bodies
    });
    (url, handle)
}

fn tool_reply(name: &str, arguments: serde_json::Value) -> serde_json::Value {
    json!({
        "choices": [{
            "message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": { "name": name, "arguments": arguments.to_string() }
                }]
            }
        }]
    })
}

fn configure(project: &TestProject, api_url: &str, max_rounds: u32) {
    let cfg = TsukuruConfig {
        api_url: api_url.to_string(),
        max_rounds,
        request_timeout_secs: 10,
        ..TsukuruConfig::default()
    };
    write_config(&ProjectPaths::new(project.root()).config_path, &cfg).expect("write config");
}

fn run_tsukuru(project: &TestProject, args: &[&str], stdin: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_tsukuru"))
        .current_dir(project.root())
        .args(args)
        .env_remove("TSUKURU_OPEN_AI_MODEL")
        .env_remove("TSUKURU_OPEN_AI_BASE_URL")
        .env("TSUKURU_OPEN_AI_ACCESS_TOKEN", "sk-test")
        .env_remove("HTTP_PROXY")
        .env_remove("http_proxy")
        .env_remove("ALL_PROXY")
        .env_remove("all_proxy")
        .env("NO_PROXY", "127.0.0.1,localhost")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn tsukuru");
    child
        .stdin
        .take()
        .expect("stdin")
        .write_all(stdin.as_bytes())
        .expect("write stdin");
    child.wait_with_output().expect("wait tsukuru")
}

#[test]
fn readme_round_trip_writes_model_content() {
    let project = TestProject::rails().expect("project");
    let (url, server) = serve_chat(vec![
        tool_reply("contents", json!({ "file_paths": ["app/models/book.rb"] })),
        tool_reply("generate_readme", json!({ "content": "# Bookshelf" })),
    ]);
    configure(&project, &url, 3);

    let output = run_tsukuru(&project, &["readme"], "Mention the books model\n\n");

    assert_eq!(
        output.status.code(),
        Some(exit_codes::OK),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let readme = std::fs::read_to_string(project.root().join("README.md")).expect("readme");
    assert_eq!(readme, "# Bookshelf\n");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("- app/models/book.rb"));
    assert!(stdout.contains("README.md generated"));

    let bodies = server.join().expect("server");
    assert_eq!(bodies.len(), 2);
    let first: serde_json::Value = serde_json::from_str(&bodies[0]).expect("json body");
    assert_eq!(first["model"], "gpt-4o-mini");
    assert_eq!(first["tool_choice"], "required");
    assert!(
        first["messages"][1]["content"]
            .as_str()
            .expect("user message")
            .contains("Mention the books model")
    );
    let second: serde_json::Value = serde_json::from_str(&bodies[1]).expect("json body");
    assert!(
        second["messages"][0]["content"]
            .as_str()
            .expect("system message")
            .contains("```app/models/book.rb")
    );
}

#[test]
fn unknown_tool_exits_with_protocol_code_and_writes_nothing() {
    let project = TestProject::rails().expect("project");
    let (url, server) = serve_chat(vec![tool_reply("drop_database", json!({}))]);
    configure(&project, &url, 3);

    let output = run_tsukuru(&project, &["rspec"], "Admin manages books\n\n");

    assert_eq!(output.status.code(), Some(exit_codes::PROTOCOL));
    assert!(String::from_utf8_lossy(&output.stderr).contains("drop_database"));
    assert!(!project.root().join("spec").exists());
    server.join().expect("server");
}

#[test]
fn bad_output_path_exits_invalid_without_calling_the_model() {
    let project = TestProject::rails().expect("project");
    let (url, server) = serve_chat(Vec::new());
    configure(&project, &url, 3);

    let output = run_tsukuru(&project, &["readme", "--output", "../README.md"], "Hi\n\n");

    assert_eq!(output.status.code(), Some(exit_codes::INVALID));
    assert!(String::from_utf8_lossy(&output.stderr).contains("--output"));
    assert!(server.join().expect("server").is_empty());
    assert!(!project.root().join("README.md").exists());
}

#[test]
fn files_lists_only_eligible_paths() {
    let project = TestProject::rails().expect("project");
    project.write("log/development.log", "x").expect("write");
    project.write("public/assets/app.js", "x").expect("write");
    project.write(".env", "SECRET=1").expect("write");

    let output = run_tsukuru(&project, &["files"], "");

    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let stdout = String::from_utf8_lossy(&output.stdout);
    let listed: Vec<&str> = stdout.lines().collect();
    assert!(listed.contains(&"Gemfile"));
    assert!(listed.contains(&"config/routes.rb"));
    assert!(!listed.iter().any(|p| p.starts_with("log/")));
    assert!(!listed.iter().any(|p| p.starts_with("public/assets/")));
    assert!(!listed.contains(&".env"));
}

#[test]
fn init_refuses_to_overwrite_without_force() {
    let project = TestProject::empty().expect("project");

    let first = run_tsukuru(&project, &["init"], "");
    assert_eq!(first.status.code(), Some(exit_codes::OK));
    assert!(project.root().join(".tsukuru/config.toml").is_file());

    let second = run_tsukuru(&project, &["init"], "");
    assert_eq!(second.status.code(), Some(exit_codes::INVALID));

    let forced = run_tsukuru(&project, &["init", "--force"], "");
    assert_eq!(forced.status.code(), Some(exit_codes::OK));
}
