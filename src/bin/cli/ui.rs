use nu_ansi_term::{Color, Style};
use std::io::IsTerminal;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Theme {
    Auto,
    Light,
    Dark,
    Plain,
}

pub struct Ui {
    palette: Palette,
    paint: bool,
}

impl Ui {
    pub fn new(theme: Theme) -> Self {
        let paint = match theme {
            Theme::Plain => false,
            Theme::Auto | Theme::Light | Theme::Dark => std::io::stdout().is_terminal(),
        };

        #[cfg(windows)]
        if paint {
            let _ = nu_ansi_term::enable_ansi_support();
        }

        let palette = match theme {
            Theme::Plain => Palette::plain(),
            Theme::Light => Palette::light(),
            Theme::Dark | Theme::Auto => Palette::dark(),
        };
        Self { palette, paint }
    }

    pub fn query(&self, prefix: Option<&str>, fragment: &str) {
        let fragment = if self.paint {
            self.palette.query.paint(fragment).to_string()
        } else {
            fragment.to_string()
        };
        match prefix {
            Some(prefix) if self.paint => {
                println!("{} {fragment}", self.palette.label.paint(prefix))
            }
            Some(prefix) => println!("{prefix} {fragment}"),
            None => println!("{fragment}"),
        }
    }

    pub fn error(&self, message: &str) {
        if self.paint && std::io::stderr().is_terminal() {
            eprintln!("{} {message}", self.palette.error.paint(ERROR_ICON));
        } else {
            eprintln!("error: {message}");
        }
    }
}

struct Palette {
    label: Style,
    query: Style,
    error: Style,
}

impl Palette {
    fn dark() -> Self {
        Self {
            label: Style::new().fg(Color::LightBlue).bold(),
            query: Style::new().fg(Color::White),
            error: Style::new().fg(Color::Yellow).bold(),
        }
    }

    fn light() -> Self {
        Self {
            label: Style::new().fg(Color::Blue).bold(),
            query: Style::new().fg(Color::Black),
            error: Style::new().fg(Color::Red).bold(),
        }
    }

    fn plain() -> Self {
        Self {
            label: Style::new(),
            query: Style::new(),
            error: Style::new(),
        }
    }
}

const ERROR_ICON: &str = "⚠";
