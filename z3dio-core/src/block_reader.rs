use std::io::{Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian};

use z3dio_types::Z3dResult;

/// Читатель фиксированных блоков — подложка всех парсеров конвейера.
///
/// Заголовок, расписание и метаданные лежат в файле подряд блоками
/// одинаковой длины; тело (отсчёты + GPS-штампы) — всё остальное до
/// конца файла.
pub struct FixedBlockReader<R> {
    inner: R,
    block_len: usize,
    stream_len: u64,
}

impl<R: Read + Seek> FixedBlockReader<R> {
    /// Создаёт читатель, сразу измеряя длину потока.
    pub fn new(
        mut inner: R,
        block_len: usize,
    ) -> Z3dResult<Self> {
        let stream_len = inner.seek(SeekFrom::End(0))?;
        inner.seek(SeekFrom::Start(0))?;

        Ok(Self {
            inner,
            block_len,
            stream_len,
        })
    }

    /// Полная длина потока в байтах.
    pub fn stream_len(&self) -> u64 {
        self.stream_len
    }

    /// Длина одного блока в байтах.
    pub fn block_len(&self) -> usize {
        self.block_len
    }

    /// Читает один блок по заданному смещению.
    ///
    /// Возвращает `None`, если от `offset` до конца потока не помещается
    /// целый блок — интерпретация (фатальная или нет) остаётся за
    /// вызывающим.
    pub fn read_block_at(
        &mut self,
        offset: u64,
    ) -> Z3dResult<Option<Vec<u8>>> {
        if offset + self.block_len as u64 > self.stream_len {
            return Ok(None);
        }

        let mut buf = vec![0u8; self.block_len];
        self.inner.seek(SeekFrom::Start(offset))?;
        self.inner.read_exact(&mut buf)?;

        Ok(Some(buf))
    }

    /// Читает остаток потока от `offset` до EOF как 32-битные
    /// little-endian слова.
    ///
    /// Чтение идёт чанками по `chunk_len` байт в один заранее
    /// подготовленный буфер — размен памяти на пропускную способность,
    /// допустимый потому что длительность записи ограничена практикой.
    /// Неполное хвостовое слово отбрасывается.
    pub fn read_words_from(
        &mut self,
        offset: u64,
        chunk_len: usize,
    ) -> Z3dResult<Vec<i32>> {
        let body_len = self.stream_len.saturating_sub(offset) as usize;
        let mut bytes = Vec::with_capacity(body_len);
        let mut chunk = vec![0u8; chunk_len];

        self.inner.seek(SeekFrom::Start(offset))?;
        loop {
            let n = self.inner.read(&mut chunk)?;
            if n == 0 {
                break;
            }
            bytes.extend_from_slice(&chunk[..n]);
        }

        let word_count = bytes.len() / 4;
        let mut words = vec![0i32; word_count];
        LittleEndian::read_i32_into(&bytes[..word_count * 4], &mut words);

        Ok(words)
    }
}
