/// Профиль аппаратной ревизии регистратора.
///
/// Все «магические» константы устройства собраны здесь и передаются
/// в декодер явно: другую ревизию железа можно поддержать конфигом,
/// без правки кода. Значения по умолчанию — ZEN rev. 2013.
#[derive(Debug, Clone)]
pub struct DeviceProfile {
    /// Длина заголовочного/метаданного блока в байтах
    pub block_len: usize,
    /// Первый сентинель GPS-штампа
    pub sentinel0: i32,
    /// Второй сентинель GPS-штампа (следует сразу за первым)
    pub sentinel1: i32,
    /// Длина GPS-штампа в байтах
    pub stamp_len: usize,
    /// Частота счётчика GPS-времени (тиков в секунду)
    pub gps_tick_rate: f64,
    /// Разница GPS-времени и UTC в секундах (GPS впереди)
    pub leap_seconds: i64,
    /// Сколько головных штампов отбрасывать безусловно
    /// (артефакт буферизации SD-карты)
    pub leading_trim_stamps: usize,
    /// Окно (в штампах), внутри которого несовпадение длины блока
    /// чинится обрезкой, а не репортуется как аномалия
    pub early_block_window: usize,
    /// Поправка программного времени старта в секундах:
    /// первый валидный GPS-фикс приходит на столько позже расписания
    pub schedule_offset_secs: i64,
    /// Размер чанка при чтении тела файла (байты)
    pub chunk_len: usize,
    /// Коэффициент перевода отсчётов АЦП в милливольты
    pub counts_to_mv: f64,
}

impl DeviceProfile {
    /// Длина GPS-штампа в 32-битных словах.
    pub fn stamp_words(&self) -> usize {
        self.stamp_len / 4
    }
}

impl Default for DeviceProfile {
    fn default() -> Self {
        Self {
            block_len: 512,
            sentinel0: i32::MAX,  // 0x7FFFFFFF
            sentinel1: i32::MIN,  // 0x80000000
            stamp_len: 64,
            gps_tick_rate: 1024.0,
            leap_seconds: 16,
            leading_trim_stamps: 3,
            early_block_window: 5,
            schedule_offset_secs: 2,
            chunk_len: 65_536,
            // число из .cac файлов даёт вольты, нам нужны мВ
            counts_to_mv: 9.536_743_164_062_5e-10,
        }
    }
}
