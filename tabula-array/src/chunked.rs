//! Columns stored as a sequence of arrow arrays.
//!
//! Chunks are shared by reference: appending the chunks of one column to another never copies
//! data. [`ChunkedArray::compact`] copies every chunk into a single contiguous array.

use arrow_array::cast::AsArray;
use arrow_array::{Array, ArrayRef, BooleanArray, UInt64Array, new_empty_array};
use arrow_schema::DataType;
use arrow_select::concat::concat;
use arrow_select::filter::filter;
use arrow_select::take::take;
use tabula_error::{TabulaResult, tabula_bail, tabula_err};
use tabula_expr::Validator;
use tabula_scalar::ScalarValue;

/// A logical array made of zero or more chunks of the same arrow type.
#[derive(Debug, Clone)]
pub struct ChunkedArray {
    chunks: Vec<ArrayRef>,
    data_type: DataType,
    len: usize,
}

impl ChunkedArray {
    pub fn try_new(chunks: Vec<ArrayRef>, data_type: DataType) -> TabulaResult<Self> {
        for chunk in &chunks {
            if chunk.data_type() != &data_type {
                tabula_bail!(MismatchedTypes: data_type, chunk.data_type());
            }
        }
        let len = chunks.iter().map(|c| c.len()).sum();
        Ok(Self {
            chunks,
            data_type,
            len,
        })
    }

    /// A chunked array holding a single empty chunk.
    pub fn empty(data_type: DataType) -> Self {
        Self {
            chunks: vec![new_empty_array(&data_type)],
            data_type,
            len: 0,
        }
    }

    pub fn chunks(&self) -> &[ArrayRef] {
        &self.chunks
    }

    pub fn nchunks(&self) -> usize {
        self.chunks.len()
    }

    #[inline]
    pub fn chunk(&self, idx: usize) -> TabulaResult<&ArrayRef> {
        self.chunks
            .get(idx)
            .ok_or_else(|| tabula_err!("chunk index {} > num chunks ({})", idx, self.nchunks()))
    }

    pub fn data_type(&self) -> &DataType {
        &self.data_type
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the data is held in at most one chunk.
    pub fn is_contiguous(&self) -> bool {
        self.chunks.len() <= 1
    }

    /// The chunk index holding `index`, and the offset of `index` within it.
    fn find_chunk_idx(&self, index: usize) -> TabulaResult<(usize, usize)> {
        let mut start = 0;
        for (chunk_idx, chunk) in self.chunks.iter().enumerate() {
            if index < start + chunk.len() {
                return Ok((chunk_idx, index - start));
            }
            start += chunk.len();
        }
        Err(tabula_err!(OutOfBounds: index, 0, self.len))
    }

    /// The value at `index`.
    pub fn scalar_at(&self, index: usize) -> TabulaResult<ScalarValue> {
        let (chunk_idx, offset) = self.find_chunk_idx(index)?;
        ScalarValue::from_arrow(self.chunk(chunk_idx)?.as_ref(), offset)
    }

    /// Append the chunks of `other` by reference.
    pub fn extend_from(&mut self, other: &ChunkedArray) -> TabulaResult<()> {
        if other.data_type != self.data_type {
            tabula_bail!(MismatchedTypes: self.data_type, other.data_type);
        }
        self.chunks.extend(other.chunks.iter().cloned());
        self.len += other.len;
        Ok(())
    }

    /// Copy every chunk into one contiguous array with freshly allocated buffers.
    ///
    /// Struct chunks are concatenated child by child, so the result is contiguous at every depth.
    pub fn compact(&self) -> TabulaResult<ArrayRef> {
        log::trace!(
            "compacting {} chunks of {} ({} rows)",
            self.nchunks(),
            self.data_type,
            self.len
        );
        match self.chunks.as_slice() {
            [] => Ok(new_empty_array(&self.data_type)),
            // concat hands a lone input back as a slice of the same buffers
            [chunk] => copy_array(chunk.as_ref()),
            chunks => {
                let refs: Vec<&dyn Array> = chunks.iter().map(|c| c.as_ref()).collect();
                Ok(concat(&refs)?)
            }
        }
    }

    /// A copy of this array held in exactly one chunk.
    pub fn compacted(&self) -> TabulaResult<Self> {
        Ok(Self {
            chunks: vec![self.compact()?],
            data_type: self.data_type.clone(),
            len: self.len,
        })
    }

    /// The array as one arrow array, sharing the chunk when there is only one and copying
    /// otherwise.
    pub fn to_array(&self) -> TabulaResult<ArrayRef> {
        self.as_contiguous().map_or_else(|| self.compact(), Ok)
    }

    /// The single chunk of a contiguous array, without copying.
    pub fn as_contiguous(&self) -> Option<ArrayRef> {
        match self.chunks.as_slice() {
            [] => Some(new_empty_array(&self.data_type)),
            [chunk] => Some(chunk.clone()),
            _ => None,
        }
    }

    /// Split a struct-typed array into one chunked array per field, without copying.
    ///
    /// The chunking of the struct is pushed down into every field. Struct-level nulls are not
    /// applied to the fields.
    pub fn fields(&self) -> TabulaResult<Vec<ChunkedArray>> {
        let DataType::Struct(fields) = &self.data_type else {
            tabula_bail!(MismatchedTypes: "struct", self.data_type);
        };
        let mut field_chunks: Vec<Vec<ArrayRef>> = vec![Vec::with_capacity(self.nchunks()); fields.len()];
        for chunk in &self.chunks {
            let chunk = chunk
                .as_struct_opt()
                .ok_or_else(|| tabula_err!(MismatchedTypes: "struct", chunk.data_type()))?;
            for (field_idx, column) in chunk.columns().iter().enumerate() {
                if let Some(target) = field_chunks.get_mut(field_idx) {
                    target.push(column.clone());
                }
            }
        }
        fields
            .iter()
            .zip(field_chunks)
            .map(|(field, chunks)| ChunkedArray::try_new(chunks, field.data_type().clone()))
            .collect()
    }

    /// The field called `name` of a struct-typed array.
    pub fn field(&self, name: &str) -> TabulaResult<ChunkedArray> {
        let DataType::Struct(fields) = &self.data_type else {
            tabula_bail!(MismatchedTypes: "struct", self.data_type);
        };
        let (idx, _) = fields
            .find(name)
            .ok_or_else(|| tabula_err!("struct has no field {}", name))?;
        self.fields()?
            .into_iter()
            .nth(idx)
            .ok_or_else(|| tabula_err!(AssertionFailed: "missing field {}", name))
    }

    /// The rows `offset..offset + len`, sharing the underlying buffers.
    pub fn slice(&self, offset: usize, len: usize) -> TabulaResult<Self> {
        let end = offset + len;
        if end > self.len {
            tabula_bail!(OutOfBounds: end, 0, self.len);
        }
        let mut chunks = Vec::new();
        let mut start = 0;
        for chunk in &self.chunks {
            let chunk_end = start + chunk.len();
            if chunk_end > offset && start < end {
                let from = offset.saturating_sub(start);
                let to = end.min(chunk_end) - start;
                chunks.push(chunk.slice(from, to - from));
            }
            start = chunk_end;
        }
        if chunks.is_empty() {
            chunks.push(new_empty_array(&self.data_type));
        }
        Self::try_new(chunks, self.data_type.clone())
    }

    /// Gather the rows at `indices`, in order, into a single new chunk.
    pub fn take(&self, indices: &dyn Array) -> TabulaResult<Self> {
        let values = self.to_array()?;
        let taken = take(values.as_ref(), indices, None)?;
        Self::try_new(vec![taken], self.data_type.clone())
    }

    /// Keep the rows where `mask` is true. The mask spans the whole array; chunking is kept.
    pub fn filter(&self, mask: &BooleanArray) -> TabulaResult<Self> {
        if mask.len() != self.len {
            tabula_bail!(
                "filter mask has length {} but the array has length {}",
                mask.len(),
                self.len
            );
        }
        let mut start = 0;
        let mut chunks = Vec::with_capacity(self.nchunks());
        for chunk in &self.chunks {
            let chunk_mask = mask.slice(start, chunk.len());
            chunks.push(filter(chunk.as_ref(), &chunk_mask)?);
            start += chunk.len();
        }
        Self::try_new(chunks, self.data_type.clone())
    }

    /// Row positions, across all chunks, whose values fail `validator`.
    pub fn failures(&self, validator: &Validator) -> TabulaResult<Vec<usize>> {
        let mut failures = Vec::new();
        let mut start = 0;
        for chunk in &self.chunks {
            failures.extend(
                validator
                    .failures(chunk.as_ref())?
                    .into_iter()
                    .map(|idx| idx + start),
            );
            start += chunk.len();
        }
        Ok(failures)
    }

    /// Whether both arrays hold the same values, regardless of chunking.
    pub fn content_eq(&self, other: &ChunkedArray) -> bool {
        if self.data_type != other.data_type || self.len != other.len {
            return false;
        }
        match (self.to_array(), other.to_array()) {
            (Ok(lhs), Ok(rhs)) => lhs.to_data() == rhs.to_data(),
            _ => false,
        }
    }
}

impl From<ArrayRef> for ChunkedArray {
    fn from(array: ArrayRef) -> Self {
        Self {
            len: array.len(),
            data_type: array.data_type().clone(),
            chunks: vec![array],
        }
    }
}

/// A copy of `array` that owns exactly its own rows, dropping any buffer it was sliced from.
fn copy_array(array: &dyn Array) -> TabulaResult<ArrayRef> {
    let indices = UInt64Array::from_iter_values(0..array.len() as u64);
    Ok(take(array, &indices, None)?)
}
