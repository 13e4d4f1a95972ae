//! Библиотека декодирования записей Zonge ZEN (.Z3D)
//!
//! Восстанавливает из сырого бинарного файла регистратора равномерный
//! временной ряд и абсолютное UTC-время старта: разбирает заголовок,
//! расписание и метаданные, находит в потоке отсчётов GPS-штампы по
//! паре сентинелей и сверяет длины блоков с заявленной частотой
//! дискретизации.
//!
//! # Быстрый старт
//!
//! ```no_run
//! use z3dio_core::Z3dDecoder;
//! use z3dio_types::DeviceProfile;
//!
//! let decoder = Z3dDecoder::new(DeviceProfile::default());
//! let recording = decoder.decode_path("mt01_20150522_080000_256_EX.Z3D")?;
//!
//! println!("{} samples @ {} Hz", recording.samples.len(), recording.sampling_rate);
//! println!("start: {}", recording.start_time_utc);
//! # Ok::<(), z3dio_types::Z3dError>(())
//! ```

pub mod block_reader;
pub mod decoder;
pub mod gpstime;
pub mod header;
pub mod metadata;
pub mod reconcile;
pub mod schedule;
pub mod stamps;

pub use block_reader::*;
pub use decoder::*;
pub use gpstime::*;
pub use header::*;
pub use metadata::*;
pub use reconcile::*;
pub use schedule::*;
pub use stamps::*;

/// Версия библиотеки.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
