use serde::Serialize;

/// Значение поля заголовка/метаданных.
///
/// Регистратор пишет все поля текстом; числовые мы приводим к f64,
/// остальные оставляем как есть.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum FieldValue {
    /// Поле распарсилось как число
    Number(f64),
    /// Поле осталось текстом
    Text(String),
}

impl FieldValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Number(v) => Some(*v),
            FieldValue::Text(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Number(_) => None,
            FieldValue::Text(s) => Some(s.as_str()),
        }
    }
}

impl std::fmt::Display for FieldValue {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            FieldValue::Number(v) => write!(f, "{v}"),
            FieldValue::Text(s) => write!(f, "{s}"),
        }
    }
}

/// Строка калибровки платы.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoardCalRow {
    pub frequency: f64,
    pub rate: f64,
    pub amplitude: f64,
    pub phase: f64,
}

/// Строка калибровки катушки.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CoilCalRow {
    pub frequency: f64,
    pub amplitude: f64,
    pub phase: f64,
}
