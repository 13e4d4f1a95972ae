use thiserror::Error;

/// Результат для операций Z3DIO
pub type Z3dResult<T> = std::result::Result<T, Z3dError>;

/// Фатальные ошибки декодирования Z3D файла.
///
/// Нефатальные находки (обрезанный хвостовой GPS-штамп, битая строка
/// калибровки и т.п.) НЕ попадают сюда — они накапливаются как
/// [`crate::DecodeAnomaly`] и возвращаются вместе с результатом.
#[derive(Debug, Error)]
pub enum Z3dError {
    /// Заголовочный блок обрезан: файл короче одного блока
    #[error("Truncated header: need {needed} bytes, file has {available}")]
    TruncatedHeader { needed: usize, available: u64 },

    /// Блок расписания обрезан
    #[error("Truncated schedule: need {needed} bytes, file has {available}")]
    TruncatedSchedule { needed: usize, available: u64 },

    /// Обязательное поле отсутствует или не парсится
    #[error("Missing or unparsable field: {0}")]
    MissingField(String),

    /// Штампов меньше, чем требует обрезка артефактов —
    /// временную базу восстановить не из чего
    #[error("Not enough GPS stamps: found {found}, need at least {needed}")]
    NotEnoughStamps { found: usize, needed: usize },

    /// Ошибки ввода/вывода (автоконвертируются из std::io::Error)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Z3dError {
    /// Удобные конструкторы
    pub fn missing_field<S: Into<String>>(s: S) -> Self {
        Self::MissingField(s.into())
    }
}
