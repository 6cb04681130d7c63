use crate::domain::model::KeyCommand;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;

/// 從標準輸入讀取鍵盤指令
pub fn spawn_stdin_listener() -> mpsc::Receiver<KeyCommand> {
    spawn_listener(BufReader::new(tokio::io::stdin()))
}

pub fn spawn_listener<I>(input: I) -> mpsc::Receiver<KeyCommand>
where
    I: AsyncBufRead + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::channel(8);

    tokio::spawn(async move {
        let mut lines = input.lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    if tx.send(KeyCommand::parse(&line)).await.is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!("Keyboard input error: {}", e);
                    break;
                }
            }
        }
    });

    rx
}
