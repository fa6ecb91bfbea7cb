use owo_colors::Style;
use std::sync::OnceLock;
use crate::item::Environment;

static THEME: OnceLock<Theme> = OnceLock::new();

#[derive(Debug, Clone)]
pub struct Theme {
    pub header: Style,
    pub success: Style,
    pub error: Style,
    pub warn: Style,
    pub info: Style,
    pub dim: Style,
    pub prod: Style,
    pub qa: Style,
    pub dev: Style,
}

impl Theme {
    pub fn detect() -> Self {
        if !console::Term::stdout().is_term() {
            return Self::plain();
        }
        Self::colored()
    }

    pub fn colored() -> Self {
        Self {
            header: Style::new().cyan().bold(),
            success: Style::new().green().bold(),
            error: Style::new().red().bold(),
            warn: Style::new().yellow().bold(),
            info: Style::new().magenta(),
            dim: Style::new().white().dimmed(),
            prod: Style::new().red(),
            qa: Style::new().yellow(),
            dev: Style::new().green(),
        }
    }

    pub fn plain() -> Self {
        Self {
            header: Style::new(),
            success: Style::new(),
            error: Style::new(),
            warn: Style::new(),
            info: Style::new(),
            dim: Style::new(),
            prod: Style::new(),
            qa: Style::new(),
            dev: Style::new(),
        }
    }

    pub fn environment(&self, env: Environment) -> Style {
        match env {
            Environment::Prod => self.prod.clone(),
            Environment::Qa => self.qa.clone(),
            Environment::Dev => self.dev.clone(),
        }
    }
}

pub fn theme() -> &'static Theme {
    THEME.get_or_init(Theme::detect)
}
