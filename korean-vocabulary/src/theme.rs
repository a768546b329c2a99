use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeColor {
    #[default]
    Indigo,
    Rose,
    Emerald,
    Amber,
    Violet,
    Sky,
}

impl ThemeColor {
    pub const ALL: [ThemeColor; 6] = [
        ThemeColor::Indigo,
        ThemeColor::Rose,
        ThemeColor::Emerald,
        ThemeColor::Amber,
        ThemeColor::Violet,
        ThemeColor::Sky,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            ThemeColor::Indigo => "indigo",
            ThemeColor::Rose => "rose",
            ThemeColor::Emerald => "emerald",
            ThemeColor::Amber => "amber",
            ThemeColor::Violet => "violet",
            ThemeColor::Sky => "sky",
        }
    }

    /// ANSI escape used to accent headings in the terminal.
    pub fn ansi(&self) -> &'static str {
        match self {
            ThemeColor::Indigo => "\x1b[38;5;63m",
            ThemeColor::Rose => "\x1b[38;5;204m",
            ThemeColor::Emerald => "\x1b[38;5;42m",
            ThemeColor::Amber => "\x1b[38;5;214m",
            ThemeColor::Violet => "\x1b[38;5;135m",
            ThemeColor::Sky => "\x1b[38;5;117m",
        }
    }
}

impl fmt::Display for ThemeColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("알 수 없는 테마 색상입니다: {0:?}")]
pub struct UnknownTheme(pub String);

impl FromStr for ThemeColor {
    type Err = UnknownTheme;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.trim().to_lowercase();
        ThemeColor::ALL
            .into_iter()
            .find(|theme| theme.name() == value)
            .ok_or(UnknownTheme(value))
    }
}
