use crate::domain::entities::{ChallengeImage, ImageHandle};
use crate::domain::value_objects::{ChallengeKey, ChallengeNotice, ChallengePhase};

/// Captcha dialog aggregate root.
///
/// The dialog is open exactly while a key is held. Every transition that
/// replaces or drops the image hands the old handle back so the owner can
/// revoke it.
#[derive(Debug, Clone, Default)]
pub struct ChallengeSession {
    key: Option<ChallengeKey>,
    image: Option<ChallengeImage>,
    solution_input: String,
    notice: Option<ChallengeNotice>,
    phase: ChallengePhase,
    generation: u64,
    attempt: u32,
}

/// Read-only snapshot rendered by a challenge surface
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChallengeView {
    pub open: bool,
    pub key: Option<ChallengeKey>,
    pub image: Option<ChallengeImage>,
    pub solution_input: String,
    pub notice: Option<ChallengeNotice>,
    pub phase: ChallengePhase,
    /// Bumps each time the dialog settles into awaiting input
    pub attempt: u32,
}

impl ChallengeView {
    pub fn awaiting_input(&self) -> bool {
        self.open && !self.phase.is_busy()
    }
}

impl ChallengeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.key.is_some()
    }

    pub fn key(&self) -> Option<&ChallengeKey> {
        self.key.as_ref()
    }

    pub fn phase(&self) -> ChallengePhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn solution_input(&self) -> &str {
        &self.solution_input
    }

    /// Whether a late result for `generation`/`key` may still be applied
    pub fn is_current(&self, generation: u64, key: &ChallengeKey) -> bool {
        self.generation == generation && self.key.as_ref() == Some(key)
    }

    /// Opens the dialog for a new challenge and returns its generation
    pub fn open(&mut self, key: ChallengeKey) -> (u64, Option<ImageHandle>) {
        let stale = self.take_image();
        self.generation += 1;
        self.key = Some(key);
        self.solution_input.clear();
        self.notice = None;
        self.phase = ChallengePhase::LoadingImage;
        (self.generation, stale)
    }

    pub fn begin_image_fetch(&mut self) -> Option<ImageHandle> {
        self.phase = ChallengePhase::LoadingImage;
        self.take_image()
    }

    pub fn image_loaded(&mut self, image: ChallengeImage) -> Option<ImageHandle> {
        let stale = self.take_image();
        self.image = Some(image);
        self.settle_idle();
        stale
    }

    pub fn image_failed(&mut self, notice: ChallengeNotice) {
        self.notice = Some(notice);
        self.settle_idle();
    }

    pub fn set_solution_input(&mut self, text: impl Into<String>) {
        self.solution_input = text.into();
    }

    pub fn begin_submit(&mut self, solution: impl Into<String>) {
        self.solution_input = solution.into();
        self.notice = None;
        self.phase = ChallengePhase::SubmittingSolution;
    }

    /// Wrong answer: same key, cleared input, a new image is on its way
    pub fn solution_rejected(&mut self, notice: ChallengeNotice) {
        self.notice = Some(notice);
        self.solution_input.clear();
        self.phase = ChallengePhase::LoadingImage;
    }

    pub fn submit_failed(&mut self, notice: ChallengeNotice) {
        self.notice = Some(notice);
        self.settle_idle();
    }

    /// Resets to closed/idle; the generation survives so late results stay stale
    pub fn close(&mut self) -> Option<ImageHandle> {
        let stale = self.take_image();
        self.key = None;
        self.solution_input.clear();
        self.notice = None;
        self.phase = ChallengePhase::Idle;
        stale
    }

    pub fn view(&self) -> ChallengeView {
        ChallengeView {
            open: self.is_open(),
            key: self.key.clone(),
            image: self.image.clone(),
            solution_input: self.solution_input.clone(),
            notice: self.notice.clone(),
            phase: self.phase,
            attempt: self.attempt,
        }
    }

    fn take_image(&mut self) -> Option<ImageHandle> {
        self.image.take().map(|image| image.handle)
    }

    fn settle_idle(&mut self) {
        self.phase = ChallengePhase::Idle;
        self.attempt += 1;
    }
}
