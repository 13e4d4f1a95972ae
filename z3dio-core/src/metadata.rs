use std::collections::BTreeMap;
use std::io::{Read, Seek};

use log::debug;

use z3dio_types::{
    BoardCalRow, CalTableKind, CoilCalRow, DecodeAnomaly, Z3dError, Z3dResult,
};

use crate::block_reader::FixedBlockReader;

/// Маркер метаданного блока (сравнение без учёта регистра).
const METADATA_MARKER: &str = "metadata record";

/// Состояние сканера калибровочных таблиц.
///
/// Таблица катушки нередко продолжается в следующих блоках, поэтому
/// сканер обязан помнить, что он «внутри» таблицы, между итерациями.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalScanState {
    Idle,
    ReadingBoardCal,
    ReadingCoilCal,
}

/// Последовательность метаданных блоков: съёмка, станция, канал,
/// опциональные калибровочные таблицы.
///
/// Блоки читаются подряд начиная сразу за расписанием; первый блок без
/// маркера "metadata record" завершает сканирование, и его НАЧАЛО
/// запоминается как `m_tell` — смещение, с которого начинаются сырые
/// отсчёты. Откат на длину блока обязателен: иначе сканер штампов
/// пропустил бы GPS-штамп, попавший на границу.
#[derive(Debug, Clone)]
pub struct MetadataBlocks {
    fields: BTreeMap<String, String>,
    board_cal: Vec<BoardCalRow>,
    coil_cal: Vec<CoilCalRow>,
    m_tell: u64,
    block_count: usize,
    anomalies: Vec<DecodeAnomaly>,
}

impl MetadataBlocks {
    /// Сканирует метаданные блоки начиная со смещения `2 * block_len`.
    pub fn read_from<R: Read + Seek>(
        reader: &mut FixedBlockReader<R>,
    ) -> Z3dResult<Self> {
        let block_len = reader.block_len() as u64;
        let mut offset = 2 * block_len;

        let mut meta = Self {
            fields: BTreeMap::new(),
            board_cal: Vec::new(),
            coil_cal: Vec::new(),
            m_tell: offset,
            block_count: 0,
            anomalies: Vec::new(),
        };

        let mut state = CalScanState::Idle;
        let mut board_ok = true;
        let mut coil_ok = true;

        loop {
            let Some(block) = reader.read_block_at(offset)? else {
                // целый блок не влазит — метаданные кончились
                meta.m_tell = offset;
                break;
            };

            let text = String::from_utf8_lossy(&block);
            if !text.to_lowercase().contains(METADATA_MARKER) {
                meta.m_tell = offset;
                break;
            }

            meta.block_count += 1;
            state = meta.parse_block(&text, state, &mut board_ok, &mut coil_ok);
            offset += block_len;
        }

        if !board_ok {
            meta.board_cal.clear();
        }
        if !coil_ok {
            meta.coil_cal.clear();
        }

        debug!(
            "metadata: {} blocks, m_tell={}, board cal {} rows, coil cal {} rows",
            meta.block_count,
            meta.m_tell,
            meta.board_cal.len(),
            meta.coil_cal.len()
        );

        Ok(meta)
    }

    /// Разбирает содержательную строку одного блока.
    ///
    /// Первая строка блока несёт маркер, полезная нагрузка — вторая.
    fn parse_block(
        &mut self,
        text: &str,
        state: CalScanState,
        board_ok: &mut bool,
        coil_ok: &mut bool,
    ) -> CalScanState {
        let trimmed = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
        let Some(content) = trimmed.split('\n').nth(1) else {
            return state;
        };
        let content = content.trim();
        let lower = content.to_lowercase();

        if content.matches('|').count() > 1 {
            self.parse_pairs(content);
            CalScanState::Idle
        } else if lower.contains("cal.brd") {
            self.parse_board_cal(content, board_ok);
            CalScanState::ReadingBoardCal
        } else if lower.contains("cal.ant") {
            self.parse_coil_cal_start(content, coil_ok);
            CalScanState::ReadingCoilCal
        } else {
            match state {
                CalScanState::ReadingCoilCal => {
                    self.parse_cal_rows(content, CalTableKind::Coil, coil_ok)
                }
                CalScanState::ReadingBoardCal => {
                    self.parse_cal_rows(content, CalTableKind::Board, board_ok)
                }
                CalScanState::Idle => {}
            }
            state
        }
    }

    /// Блок из `|`-разделённых подполей `key=value` и пары `line.name`.
    fn parse_pairs(
        &mut self,
        content: &str,
    ) {
        for segment in content.split('|') {
            let lower = segment.to_lowercase();
            if lower.contains("line.name") {
                // пара с ',' вместо '='
                let Some((raw_key, raw_value)) = segment.split_once(',') else {
                    continue;
                };
                self.insert_pair(raw_key, raw_value);
            } else if let Some((raw_key, raw_value)) = segment.split_once('=') {
                self.insert_pair(raw_key, raw_value);
            }
        }
    }

    fn insert_pair(
        &mut self,
        raw_key: &str,
        raw_value: &str,
    ) {
        let key = raw_key.trim().replace('.', "_").to_lowercase();
        if key.is_empty() {
            return;
        }
        self.fields.insert(key, raw_value.trim().to_string());
    }

    /// Блок `cal.brd,<ид>,<строка>:<строка>,...` — таблица платы.
    fn parse_board_cal(
        &mut self,
        content: &str,
        board_ok: &mut bool,
    ) {
        let mut parts = content.split(',');
        let Some(raw_key) = parts.next() else {
            return;
        };
        if let Some(id) = parts.next() {
            self.insert_pair(raw_key, id);
        }

        for row in parts {
            let row = row.replace(['\0', '|'], "");
            let row = row.trim();
            if row.is_empty() {
                continue;
            }
            self.push_board_row(row, board_ok);
        }
    }

    /// Блок `cal.ant`; таблица катушки иногда начинается посреди блока,
    /// тогда содержательная строка разрезается по `|` ещё раз.
    fn parse_coil_cal_start(
        &mut self,
        content: &str,
        coil_ok: &mut bool,
    ) {
        let Some((first, rest)) = content.split_once('|') else {
            // маркер без данных: строки начнутся в следующих блоках
            return;
        };

        if let Some((raw_key, raw_value)) = first.split_once(',') {
            self.insert_pair(raw_key, raw_value);
        }

        let second = rest.split('|').next().unwrap_or("");
        let mut tokens = second.split(',');
        let Some(head) = tokens.next() else {
            return;
        };

        if head.to_lowercase().contains("cal.ant") {
            if let Some((raw_key, raw_value)) = head.split_once('=') {
                self.insert_pair(raw_key, raw_value);
            }
        } else {
            for row in tokens {
                let row = row.trim();
                if row.is_empty() || row.contains('\0') {
                    continue;
                }
                self.push_coil_row(row, coil_ok);
            }
        }
    }

    /// Блок-продолжение таблицы: `f:a:p,f:a:p,...`
    fn parse_cal_rows(
        &mut self,
        content: &str,
        table: CalTableKind,
        table_ok: &mut bool,
    ) {
        for row in content.split(',') {
            if row.contains('\0') {
                continue;
            }
            let row = row.trim();
            if row.is_empty() {
                continue;
            }
            match table {
                CalTableKind::Board => self.push_board_row(row, table_ok),
                CalTableKind::Coil => self.push_coil_row(row, table_ok),
            }
        }
    }

    fn push_board_row(
        &mut self,
        row: &str,
        table_ok: &mut bool,
    ) {
        match parse_numeric_row(row) {
            Some(v) if v.len() == 4 => self.board_cal.push(BoardCalRow {
                frequency: v[0],
                rate: v[1],
                amplitude: v[2],
                phase: v[3],
            }),
            _ => self.drop_table(CalTableKind::Board, row, table_ok),
        }
    }

    fn push_coil_row(
        &mut self,
        row: &str,
        table_ok: &mut bool,
    ) {
        match parse_numeric_row(row) {
            Some(v) if v.len() == 3 => self.coil_cal.push(CoilCalRow {
                frequency: v[0],
                amplitude: v[1],
                phase: v[2],
            }),
            _ => self.drop_table(CalTableKind::Coil, row, table_ok),
        }
    }

    /// Калибровка — необязательные метаданные: битая строка сбрасывает
    /// таблицу целиком, разбор файла продолжается.
    fn drop_table(
        &mut self,
        table: CalTableKind,
        row: &str,
        table_ok: &mut bool,
    ) {
        if *table_ok {
            self.anomalies.push(DecodeAnomaly::MalformedCalibrationRow {
                table,
                row: row.to_string(),
            });
        }
        *table_ok = false;
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> {
        &self.fields
    }

    /// Калибровка платы (пустая, если отсутствует или повреждена).
    pub fn board_cal(&self) -> &[BoardCalRow] {
        &self.board_cal
    }

    /// Калибровка катушки (пустая, если отсутствует или повреждена).
    pub fn coil_cal(&self) -> &[CoilCalRow] {
        &self.coil_cal
    }

    /// Смещение начала сырых отсчётов.
    pub fn m_tell(&self) -> u64 {
        self.m_tell
    }

    /// Сколько метаданных блоков прочитано.
    pub fn block_count(&self) -> usize {
        self.block_count
    }

    /// Аномалии, найденные при сканировании.
    pub fn anomalies(&self) -> &[DecodeAnomaly] {
        &self.anomalies
    }

    /// Имя станции: `line_name` + первый `:`-токен поля `rx_xyz0`.
    pub fn station(&self) -> Z3dResult<String> {
        let line = self
            .fields
            .get("line_name")
            .ok_or_else(|| Z3dError::missing_field("line.name"))?;
        let rx = self
            .fields
            .get("rx_xyz0")
            .ok_or_else(|| Z3dError::missing_field("rx.xyz0"))?;
        let number = rx.split(':').next().unwrap_or("");

        Ok(format!("{line}{number}"))
    }
}

fn parse_numeric_row(row: &str) -> Option<Vec<f64>> {
    row.split(':')
        .map(|t| t.trim().parse::<f64>().ok())
        .collect()
}
