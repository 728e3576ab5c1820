use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::application::captcha::{ChallengeCoordinator, SubmitOutcome};
use crate::domain::{ChallengeImage, ChallengeNotice, ChallengeView};

/// Renders the captcha dialog on a terminal: the image goes to a file, the
/// answer comes from a line of input
pub struct TerminalSurface {
    coordinator: Arc<ChallengeCoordinator>,
    image_dir: PathBuf,
}

impl TerminalSurface {
    pub fn new(coordinator: Arc<ChallengeCoordinator>, image_dir: impl Into<PathBuf>) -> Self {
        Self {
            coordinator,
            image_dir: image_dir.into(),
        }
    }

    /// Serves the dialog from stdin/stderr until the coordinator goes away
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let input = BufReader::new(tokio::io::stdin());
            if let Err(e) = self.run(input, tokio::io::stderr()).await {
                warn!(error = %e, "captcha prompt stopped");
            }
        })
    }

    pub async fn run<R, W>(self, input: R, mut output: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut views = self.coordinator.subscribe();
        let mut lines = input.lines();
        let mut last_attempt = None;

        loop {
            let view = views.borrow_and_update().clone();
            if view.awaiting_input() && last_attempt != Some(view.attempt) {
                last_attempt = Some(view.attempt);
                self.prompt(&view, &mut output).await?;
                let line = lines.next_line().await?;
                self.answer(line).await;
                continue;
            }
            if views.changed().await.is_err() {
                return Ok(());
            }
        }
    }

    async fn prompt<W: AsyncWrite + Unpin>(&self, view: &ChallengeView, output: &mut W) -> std::io::Result<()> {
        let mut text = String::new();
        if let Some(notice) = &view.notice {
            text.push_str(&notice_line(notice));
        }
        match &view.image {
            Some(image) => {
                let path = write_image(&self.image_dir, image).await?;
                text.push_str(&format!("Captcha image saved to {}\n", path.display()));
            }
            None => text.push_str("Captcha image unavailable\n"),
        }
        text.push_str("Enter the captcha (empty or 'cancel' to abort): ");

        output.write_all(text.as_bytes()).await?;
        output.flush().await
    }

    async fn answer(&self, line: Option<String>) {
        let answer = line.as_deref().map(str::trim).unwrap_or_default();
        if answer.is_empty() || answer.eq_ignore_ascii_case("cancel") {
            self.coordinator.cancel().await;
            return;
        }

        self.coordinator.set_solution_input(answer).await;
        match self.coordinator.submit_solution(answer).await {
            SubmitOutcome::Accepted { retried_ok } => debug!(retried_ok, "captcha accepted"),
            outcome => debug!(?outcome, "captcha answer not accepted"),
        }
    }
}

/// Rejected answers invite another try; anything else is reported as a failure
fn notice_line(notice: &ChallengeNotice) -> String {
    if notice.is_recoverable_rejection() {
        format!("Not accepted: {}. Try again.\n", notice)
    } else {
        format!("Error: {}\n", notice)
    }
}

async fn write_image(dir: &Path, image: &ChallengeImage) -> std::io::Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(format!("captcha-{}.{}", image.handle, image.extension()));
    tokio::fs::write(&path, &image.bytes).await?;
    Ok(path)
}
