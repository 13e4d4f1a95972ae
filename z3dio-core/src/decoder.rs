use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::Serialize;

use z3dio_types::{DecodeAnomaly, DeviceProfile, GpsStamp, Z3dError, Z3dResult};

use crate::block_reader::FixedBlockReader;
use crate::gpstime;
use crate::header::HeaderBlock;
use crate::metadata::MetadataBlocks;
use crate::reconcile::reconcile;
use crate::schedule::ScheduleBlock;
use crate::stamps::scan_stamps;

/// Стадии конвейера декодирования.
///
/// Переходы односторонние: `Unopened → HeaderParsed → ScheduleParsed →
/// MetadataParsed → StampsScanned → Reconciled → Done`; любая стадия
/// может оборваться фатальной ошибкой. Повторный разбор — новый проход
/// с нуля, частично-разобранное состояние наружу не отдаётся.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    Unopened,
    HeaderParsed,
    ScheduleParsed,
    MetadataParsed,
    StampsScanned,
    Reconciled,
    Done,
}

/// Диагностика одного прохода декодирования.
#[derive(Debug, Clone, Serialize)]
pub struct DecodeDiagnostics {
    /// Штампов найдено сканером до обрезок
    pub stamps_found: usize,
    /// Штампов удержано в итоге
    pub stamps_retained: usize,
    /// Отброшено головных штампов
    pub leading_trimmed: usize,
    /// Отброшено штампов по длинам блоков
    pub block_trimmed: usize,
    /// Удержано отсчётов
    pub samples_retained: usize,
    /// Метаданных блоков прочитано
    pub metadata_blocks: usize,
    /// UTC-время старта строкой `YYYY-MM-DD,HH:MM:SS`
    pub start_time_utc: String,
    /// Производное время минус программное, секунды
    pub schedule_drift_secs: Option<f64>,
    /// Время разбора, секунды
    pub read_secs: f64,
    /// Все нефатальные находки прохода
    pub anomalies: Vec<DecodeAnomaly>,
}

impl DecodeDiagnostics {
    /// Диагностика в JSON — для журналов полевых кампаний.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// Итог декодирования: непрерывный ряд отсчётов и его временная база.
///
/// Отсчёты отдаются в сырых единицах АЦП; перевод в физические единицы
/// (и вся дальнейшая обработка) — дело потребителя.
#[derive(Debug, Clone)]
pub struct DecodedRecording {
    /// Отсчёты АЦП
    pub samples: Vec<i32>,
    /// Частота дискретизации, Гц (постоянна на всю запись)
    pub sampling_rate: f64,
    /// Абсолютное UTC-время первого отсчёта
    pub start_time_utc: DateTime<Utc>,
    /// Удержанные GPS-штампы
    pub stamps: Vec<GpsStamp>,
    /// Имя станции из метаданных (если они полны)
    pub station: Option<String>,
    /// Разобранный заголовок
    pub header: HeaderBlock,
    /// Разобранное расписание (с поправкой времени)
    pub schedule: ScheduleBlock,
    /// Метаданные и калибровочные таблицы
    pub metadata: MetadataBlocks,
    /// Диагностика прохода
    pub diagnostics: DecodeDiagnostics,
    counts_to_mv: f64,
}

impl DecodedRecording {
    /// UTC-время старта строкой.
    pub fn start_time_string(&self) -> String {
        gpstime::format_timestamp(&self.start_time_utc)
    }

    /// Отсчёты в милливольтах (без учёта калибровочных таблиц —
    /// частотные поправки делает потребитель калибровок).
    pub fn to_millivolts(&self) -> Vec<f64> {
        self.samples
            .iter()
            .map(|&c| c as f64 * self.counts_to_mv)
            .collect()
    }
}

/// Декодер Z3D файлов.
///
/// Конвейер строго последовательный: выходное смещение каждой стадии —
/// входное следующей, поэтому стадии не параллелятся. Один экземпляр
/// можно переиспользовать для многих файлов; проход владеет своим
/// буфером единолично.
pub struct Z3dDecoder {
    profile: DeviceProfile,
}

impl Z3dDecoder {
    pub fn new(profile: DeviceProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &DeviceProfile {
        &self.profile
    }

    /// Декодирует файл по пути.
    pub fn decode_path<P: AsRef<Path>>(
        &self,
        path: P,
    ) -> Z3dResult<DecodedRecording> {
        let path = path.as_ref();
        info!("------- Reading {} -------", path.display());

        let file = File::open(path)?;
        self.decode_reader(file)
    }

    /// Декодирует запись из любого `Read + Seek` источника.
    pub fn decode_reader<R: Read + Seek>(
        &self,
        inner: R,
    ) -> Z3dResult<DecodedRecording> {
        let started = Instant::now();
        let p = &self.profile;
        let mut state = DecodeState::Unopened;

        let mut reader = FixedBlockReader::new(inner, p.block_len)
            .map_err(|e| fail(state, e))?;

        let header = HeaderBlock::read_from(&mut reader).map_err(|e| fail(state, e))?;
        state = advance(state, DecodeState::HeaderParsed);
        let sampling_rate = header.ad_rate().map_err(|e| fail(state, e))?;

        let schedule = ScheduleBlock::read_from(&mut reader, p.schedule_offset_secs)
            .map_err(|e| fail(state, e))?;
        state = advance(state, DecodeState::ScheduleParsed);

        let metadata = MetadataBlocks::read_from(&mut reader).map_err(|e| fail(state, e))?;
        state = advance(state, DecodeState::MetadataParsed);

        let words = reader
            .read_words_from(metadata.m_tell(), p.chunk_len)
            .map_err(|e| fail(state, e))?;

        let outcome = scan_stamps(&words, p);
        let stamps_found = outcome.stamps.len();
        state = advance(state, DecodeState::StampsScanned);

        // расписания без Date/Time встречаются; дрейф тогда не считаем
        let scheduled = schedule.scheduled_start().ok();

        let rec = reconcile(
            &words,
            outcome,
            sampling_rate,
            header.gps_week(),
            scheduled,
            p,
        )
        .map_err(|e| fail(state, e))?;
        state = advance(state, DecodeState::Reconciled);

        let read_secs = started.elapsed().as_secs_f64();
        info!("--> Reading data took: {read_secs:.3} seconds");
        if let Some(sched) = scheduled {
            info!(
                "    Scheduled time was {} (GPS time)",
                sched.format(gpstime::DATETIME_FMT)
            );
        }
        info!(
            "    1st good stamp was {}",
            gpstime::format_timestamp(&rec.start_time_utc)
        );
        if let Some(drift) = rec.schedule_drift_secs {
            info!("    difference of {drift:.2} seconds");
        }
        info!("    found {} GPS time stamps", rec.stamps.len());
        info!("    found {} data points", rec.samples.len());

        let mut anomalies = metadata.anomalies().to_vec();
        anomalies.extend(rec.anomalies);
        for a in &anomalies {
            warn!("decode anomaly: {a}");
        }

        let station = metadata.station().ok();
        let diagnostics = DecodeDiagnostics {
            stamps_found,
            stamps_retained: rec.stamps.len(),
            leading_trimmed: rec.leading_trimmed,
            block_trimmed: rec.block_trimmed,
            samples_retained: rec.samples.len(),
            metadata_blocks: metadata.block_count(),
            start_time_utc: gpstime::format_timestamp(&rec.start_time_utc),
            schedule_drift_secs: rec.schedule_drift_secs,
            read_secs,
            anomalies,
        };

        advance(state, DecodeState::Done);

        Ok(DecodedRecording {
            samples: rec.samples,
            sampling_rate,
            start_time_utc: rec.start_time_utc,
            stamps: rec.stamps,
            station,
            header,
            schedule,
            metadata,
            diagnostics,
            counts_to_mv: p.counts_to_mv,
        })
    }
}

impl Default for Z3dDecoder {
    fn default() -> Self {
        Self::new(DeviceProfile::default())
    }
}

fn advance(
    from: DecodeState,
    to: DecodeState,
) -> DecodeState {
    debug!("decode state: {from:?} -> {to:?}");
    to
}

fn fail(
    state: DecodeState,
    e: Z3dError,
) -> Z3dError {
    warn!("decode failed in state {state:?}: {e}");
    e
}
