use anyhow::{Context, Result};
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::tempdir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpListener;

struct TestBot {
    child: Child,
    _dir: tempfile::TempDir,
}

impl Drop for TestBot {
    fn drop(&mut self) {
        let _ = self.child.kill();
    }
}

struct TestServer {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl TestServer {
    async fn send(&mut self, line: &str) -> Result<()> {
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\r\n").await?;
        Ok(())
    }

    async fn expect_line(&mut self) -> Result<String> {
        let line = tokio::time::timeout(Duration::from_secs(10), self.lines.next_line())
            .await
            .context("timeout waiting for bot line")??;
        line.context("bot closed the connection")
    }
}

#[tokio::test]
async fn bot_handshakes_joins_and_answers_commands() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let port = listener.local_addr()?.port();
    let _bot = start_bot(port)?;

    let (stream, _) = tokio::time::timeout(Duration::from_secs(10), listener.accept())
        .await
        .context("bot did not connect")??;
    let (reader, writer) = stream.into_split();
    let mut server = TestServer {
        lines: BufReader::new(reader).lines(),
        writer,
    };

    assert_eq!(server.expect_line().await?, "PASS oauth:testtoken");
    assert_eq!(server.expect_line().await?, "NICK testbot");
    assert_eq!(server.expect_line().await?, "CAP REQ :twitch.tv/membership");
    assert_eq!(server.expect_line().await?, "JOIN #somechannel");

    server.send("PING :tmi.twitch.tv").await?;
    assert_eq!(server.expect_line().await?, "PONG :tmi.twitch.tv");

    server
        .send(":alice!alice@host PRIVMSG #somechannel :!ping")
        .await?;
    assert_eq!(server.expect_line().await?, "PRIVMSG #somechannel :Pong!");

    server
        .send(":bob!bob@host PRIVMSG #somechannel :!discord")
        .await?;
    assert_eq!(
        server.expect_line().await?,
        "PRIVMSG #somechannel :discord.gg/example"
    );

    server
        .send(":carol!carol@host PRIVMSG #somechannel :!lurk")
        .await?;
    server
        .send(":carol!carol@host PRIVMSG #otherchannel :!lurk")
        .await?;
    assert_eq!(
        server.expect_line().await?,
        "PRIVMSG #otherchannel :enjoy the lurk"
    );

    server
        .send(":dave!dave@host PRIVMSG #otherchannel :!ping")
        .await?;
    assert_eq!(
        server.expect_line().await?,
        "PRIVMSG #otherchannel :dave: Pong!"
    );

    Ok(())
}

#[test]
fn missing_credentials_fail_fast() -> Result<()> {
    let dir = tempdir()?;
    let output = Command::new(env!("CARGO_BIN_EXE_twitchbot"))
        .arg("--config")
        .arg(dir.path().join("absent.toml"))
        .output()
        .context("run twitchbot")?;
    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("must specify nickname and oauth token"));
    Ok(())
}

fn start_bot(port: u16) -> Result<TestBot> {
    let dir = tempdir()?;
    let config_path = dir.path().join("bot.toml");
    std::fs::write(
        &config_path,
        format!(
            r#"
[bot]
nickname = "testbot"
oauth_token = "oauth:testtoken"

[connection]
tls = false
plain_addr = "127.0.0.1:{port}"
channels = ["somechannel"]

[[text_commands]]
aliases = ["discord"]
response = "discord.gg/example"

[[text_commands]]
channel = "otherchannel"
aliases = ["lurk"]
response = "enjoy the lurk"

[[modified_commands]]
channel = "otherchannel"
command = "ping"
text = "{{user}}: {{response}}"
"#
        ),
    )?;

    let child = Command::new(env!("CARGO_BIN_EXE_twitchbot"))
        .arg("--config")
        .arg(&config_path)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .context("spawn twitchbot")?;

    Ok(TestBot { child, _dir: dir })
}
