use serde::Serialize;

use super::router::Route;
use crate::error::{ErrorKind, Recovery};
use crate::kernel::state::{ArmingPhase, FinalizingPhase, FrameSlot, IdleNotice, SessionState};

const RESTART_ICON: &str = "🔄";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonColor {
    Green,
    Blue,
    Red,
    Gray,
}

/// What pressing the primary control does in the current state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PrimaryAction {
    ArmCamera,
    Capture(FrameSlot),
    ReturnHome,
    /// Control is shown but pressing it does nothing.
    Nothing,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimaryControl {
    pub label: &'static str,
    pub color: ButtonColor,
    pub comment: Option<&'static str>,
    pub enabled: bool,
    pub action: PrimaryAction,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusTone {
    Info,
    Success,
    Warning,
    Danger,
}

/// Secondary link shown inside the status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Affordance {
    RetryCamera,
    Restart,
}

impl Affordance {
    pub fn label(self) -> String {
        match self {
            Affordance::RetryCamera => format!("{RESTART_ICON} Réessayer"),
            Affordance::Restart => format!("{RESTART_ICON} Redémarrer"),
        }
    }
}

impl From<Recovery> for Affordance {
    fn from(recovery: Recovery) -> Self {
        match recovery {
            Recovery::Retry => Affordance::RetryCamera,
            Recovery::Restart => Affordance::Restart,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusLine {
    pub tone: StatusTone,
    pub text: String,
    pub affordance: Option<Affordance>,
}

impl StatusLine {
    fn new(tone: StatusTone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
            affordance: None,
        }
    }

    fn offering(mut self, affordance: Affordance) -> Self {
        self.affordance = Some(affordance);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ArtifactPanel {
    Hidden,
    Preparing { message: &'static str },
    Ready { message: &'static str, filename: String },
}

/// Everything a view layer needs to draw the home screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiDescription {
    pub route: Route,
    pub primary: Option<PrimaryControl>,
    pub status: Option<StatusLine>,
    pub scoring_visible: bool,
    pub final_snapshot_visible: bool,
    pub camera_visible: bool,
    pub artifact: ArtifactPanel,
}

impl UiDescription {
    /// Action the primary control would trigger, if it is visible and enabled.
    pub fn enabled_action(&self) -> Option<PrimaryAction> {
        self.primary
            .as_ref()
            .filter(|control| control.enabled)
            .map(|control| control.action)
            .filter(|action| *action != PrimaryAction::Nothing)
    }
}

fn control(
    label: &'static str,
    color: ButtonColor,
    comment: &'static str,
    enabled: bool,
    action: PrimaryAction,
) -> Option<PrimaryControl> {
    Some(PrimaryControl {
        label,
        color,
        comment: Some(comment),
        enabled,
        action,
    })
}

/// Pure projection of the session state onto the interface. Calling it twice
/// with the same inputs yields the same description.
pub fn render(state: &SessionState, route: &Route) -> UiDescription {
    let mut ui = UiDescription {
        route: route.clone(),
        primary: None,
        status: None,
        scoring_visible: false,
        final_snapshot_visible: false,
        camera_visible: false,
        artifact: ArtifactPanel::Hidden,
    };

    match state {
        SessionState::Idle { notice: None } => {
            ui.primary = control(
                "Prêt ?",
                ButtonColor::Green,
                "Lance la caméra pour commencer.",
                true,
                PrimaryAction::ArmCamera,
            );
        }
        SessionState::Idle { notice: Some(IdleNotice::CameraBlocked { .. }) } => {
            ui.status = Some(
                StatusLine::new(StatusTone::Danger, "Caméra bloquée.")
                    .offering(ErrorKind::CameraAccessDenied.recovery().into()),
            );
            ui.primary = control(
                "Prêt ?",
                ButtonColor::Green,
                "Relance la caméra pour retenter.",
                true,
                PrimaryAction::ArmCamera,
            );
        }
        SessionState::CameraArming { phase: ArmingPhase::Requesting } => {
            ui.status = Some(StatusLine::new(StatusTone::Info, "Demande d'accès à la caméra... Un instant !"));
            ui.primary = control(
                "Prêt ?",
                ButtonColor::Green,
                "Autorise la caméra dans la fenêtre du navigateur.",
                false,
                PrimaryAction::Nothing,
            );
        }
        SessionState::CameraArming { phase: ArmingPhase::Stabilizing } => {
            ui.camera_visible = true;
            ui.status = Some(StatusLine::new(
                StatusTone::Info,
                "Initialisation de la caméra... Stabilisation en cours.",
            ));
            ui.primary = control(
                "Stabilisation... ⏳",
                ButtonColor::Green,
                "Patiente un instant, la caméra se met au point.",
                false,
                PrimaryAction::Nothing,
            );
        }
        SessionState::CapturePrompt => {
            ui.camera_visible = true;
            ui.primary = control(
                "Go !",
                ButtonColor::Blue,
                "Cadre l'énoncé et capture-le.",
                true,
                PrimaryAction::Capture(FrameSlot::Prompt),
            );
        }
        SessionState::Running { .. } => {
            ui.camera_visible = true;
            ui.status = Some(StatusLine::new(StatusTone::Success, "Top départ ! L'élève est en action."));
            ui.primary = control(
                "Ok !?",
                ButtonColor::Green,
                "Clique quand l'élève donne sa réponse.",
                true,
                PrimaryAction::Capture(FrameSlot::Response),
            );
        }
        SessionState::AwaitingStop { .. } => {
            ui.camera_visible = true;
            ui.status = Some(StatusLine::new(StatusTone::Danger, "Il a fini ! Prépare la preuve finale."));
            ui.primary = control(
                "Stop !",
                ButtonColor::Red,
                "Fige la preuve avec un dernier clic.",
                true,
                PrimaryAction::Capture(FrameSlot::Result),
            );
        }
        SessionState::AwaitingScore { session } => {
            let reco = session.recommendation().map(|s| s.value()).unwrap_or_default();
            ui.status = Some(StatusLine::new(
                StatusTone::Warning,
                format!("Note le tripkik ! Recommandation IA: {reco}."),
            ));
            ui.scoring_visible = true;
            ui.final_snapshot_visible = true;
        }
        SessionState::Finalizing { phase, .. } => {
            ui.status = Some(StatusLine::new(StatusTone::Warning, "Génération du GIF..."));
            ui.artifact = match phase {
                FinalizingPhase::Compiling => {
                    ui.final_snapshot_visible = true;
                    ArtifactPanel::Preparing {
                        message: "Préparation du tripkik animé...",
                    }
                }
                FinalizingPhase::Settling { artifact } | FinalizingPhase::Archiving { artifact } => {
                    ArtifactPanel::Ready {
                        message: "Tripkik généré !",
                        filename: artifact.filename.clone(),
                    }
                }
            };
        }
        SessionState::Completed { artifact, .. } => {
            ui.status = Some(StatusLine::new(
                StatusTone::Info,
                "Tripkik archivé fullstats ! Téléchargez la preuve GIF.",
            ));
            ui.artifact = ArtifactPanel::Ready {
                message: "Tripkik généré !",
                filename: artifact.filename.clone(),
            };
            ui.primary = control(
                "Home",
                ButtonColor::Gray,
                "Retour à l'accueil.",
                true,
                PrimaryAction::ReturnHome,
            );
        }
        SessionState::Failed { failure } => {
            ui.status = Some(
                StatusLine::new(StatusTone::Danger, format!("Erreur critique : {}.", failure.message))
                    .offering(failure.recovery().into()),
            );
        }
    }

    // The primary control lives on the home view only.
    if !route.is_home() {
        ui.primary = None;
    }

    ui
}
