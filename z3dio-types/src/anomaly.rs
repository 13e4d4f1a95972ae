use serde::Serialize;

/// Нефатальная аномалия, найденная при декодировании.
///
/// Частичные записи имеют научную ценность, поэтому такие находки
/// не прерывают разбор: они накапливаются и возвращаются вызывающему
/// вместе с best-effort результатом.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DecodeAnomaly {
    /// Сентинель найден слишком близко к концу потока:
    /// штамп дочитать нельзя, запись усечена на этом месте
    IncompleteTrailingStamp {
        /// Индекс слова-кандидата в сыром потоке
        word_index: usize,
    },

    /// Длина блока между штампами не равна частоте дискретизации
    /// (штампы номинально идут раз в секунду)
    BlockLengthMismatch {
        /// Порядковый номер штампа (после всех обрезок)
        ordinal: usize,
        expected: i32,
        found: i32,
    },

    /// Строка калибровочной таблицы не привелась к числам;
    /// вся таблица файла сброшена
    MalformedCalibrationRow {
        table: CalTableKind,
        row: String,
    },

    /// Соседние GPS-штампы отстоят не на ~1 секунду
    GpsTimeDiscontinuity {
        ordinal: usize,
        /// Разница времени соседних штампов в секундах
        delta_secs: f64,
    },
}

/// Какая из двух калибровочных таблиц повреждена.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CalTableKind {
    /// Калибровка платы (frequency, rate, amplitude, phase)
    Board,
    /// Калибровка катушки (frequency, amplitude, phase)
    Coil,
}

impl std::fmt::Display for DecodeAnomaly {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        match self {
            DecodeAnomaly::IncompleteTrailingStamp { word_index } => {
                write!(f, "incomplete trailing stamp at word {word_index}")
            }
            DecodeAnomaly::BlockLengthMismatch {
                ordinal,
                expected,
                found,
            } => {
                write!(
                    f,
                    "block length mismatch at stamp {ordinal}: expected {expected}, found {found}"
                )
            }
            DecodeAnomaly::MalformedCalibrationRow { table, row } => {
                write!(f, "malformed {table:?} calibration row: '{row}'")
            }
            DecodeAnomaly::GpsTimeDiscontinuity {
                ordinal,
                delta_secs,
            } => {
                write!(
                    f,
                    "gps time discontinuity at stamp {ordinal}: {delta_secs:.3} s between stamps"
                )
            }
        }
    }
}
