use serde::Serialize;

/// GPS-штамп — 64-байтная запись, вшитая в поток отсчётов раз в секунду.
///
/// Физическая раскладка (little-endian): два сентинеля i32, счётчик
/// времени i32 (1024 тика/с), широта и долгота f64, далее девять
/// 4-байтных диагностических полей устройства.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GpsStamp {
    /// Счётчик GPS-времени в тиках (1024 тика на секунду)
    pub time: i32,
    /// Широта приёмника, радианы
    pub lat: f64,
    /// Долгота приёмника, радианы
    pub lon: f64,
    /// Количество спутников
    pub num_sat: i32,
    /// Чувствительность приёмника
    pub gps_sens: i32,
    /// Температура платы, °C
    pub temperature: f32,
    /// Напряжение питания, В
    pub voltage: f32,
    /// Счётчик FPGA
    pub num_fpga: i32,
    /// Счётчик АЦП
    pub num_adc: i32,
    /// Счётчик PPS-импульсов
    pub pps_count: i32,
    /// Подстройка ЦАП
    pub dac_tune: i32,
    /// Сколько слов-отсчётов предшествовало штампу
    /// (0 для самого первого штампа)
    pub block_len: i32,
    /// Смещение начала штампа в потоке слов.
    ///
    /// Вместо исторического зануления слов штампа мы помним его
    /// диапазон и собираем отсчёты, пропуская эти интервалы.
    #[serde(skip)]
    pub word_offset: usize,
}
