//! Irap Binary surface codec.
//!
//! The format is big-endian throughout: a fixed 100-byte header whose fields
//! are interleaved with Fortran unformatted record markers, followed by `ny`
//! framed records of `nx` float32 values each. The header is read and
//! written through a fixed-layout struct so the marker values survive a
//! round trip byte-exactly.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use zerocopy::byteorder::{BigEndian, F32, I32};
use zerocopy::{AsBytes, FromBytes, LayoutVerified, Unaligned};

use crate::error::SurfaceQueryError;
use crate::surface::Surface;

/// Size of the fixed header in bytes.
pub const HEADER_SIZE: usize = 100;

// Fortran record markers carried by the header. Invariant on read, emitted
// verbatim on write.
const RECORD_MARKER_1: i32 = 32;
const RECORD_MARKER_2: i32 = 16;
const RECORD_MARKER_3: i32 = 28;

/// The 100-byte Irap Binary header with its exact on-disk layout.
#[derive(AsBytes, FromBytes, Unaligned)]
#[repr(C)]
struct IrapBinaryHeader {
    start_record: I32<BigEndian>,
    id_flag: I32<BigEndian>,
    ny: I32<BigEndian>,
    xori: F32<BigEndian>,
    xmax: F32<BigEndian>,
    yori: F32<BigEndian>,
    ymax: F32<BigEndian>,
    xinc: F32<BigEndian>,
    yinc: F32<BigEndian>,
    stop_record: I32<BigEndian>,
    start_record2: I32<BigEndian>,
    nx: I32<BigEndian>,
    rot: F32<BigEndian>,
    x0ori: F32<BigEndian>,
    y0ori: F32<BigEndian>,
    stop_record2: I32<BigEndian>,
    start_record3: I32<BigEndian>,
    dummy: [I32<BigEndian>; 7],
    stop_record3: I32<BigEndian>,
}

impl IrapBinaryHeader {
    fn from_surface(surface: &Surface) -> IrapBinaryHeader {
        IrapBinaryHeader {
            start_record: I32::new(RECORD_MARKER_1),
            id_flag: I32::new(surface.id_flag),
            ny: I32::new(surface.ny),
            xori: F32::new(surface.xori),
            xmax: F32::new(surface.xmax),
            yori: F32::new(surface.yori),
            ymax: F32::new(surface.ymax),
            xinc: F32::new(surface.xinc),
            yinc: F32::new(surface.yinc),
            stop_record: I32::new(RECORD_MARKER_1),
            start_record2: I32::new(RECORD_MARKER_2),
            nx: I32::new(surface.nx),
            rot: F32::new(surface.rot),
            x0ori: F32::new(surface.x0ori),
            y0ori: F32::new(surface.y0ori),
            stop_record2: I32::new(RECORD_MARKER_2),
            start_record3: I32::new(RECORD_MARKER_3),
            dummy: [I32::new(0); 7],
            stop_record3: I32::new(RECORD_MARKER_3),
        }
    }
}

fn malformed(reason: &'static str) -> SurfaceQueryError {
    SurfaceQueryError::MalformedBlob { reason }
}

/// Decode an Irap Binary blob into a [Surface].
pub fn decode(blob: &[u8]) -> Result<Surface, SurfaceQueryError> {
    if blob.len() < HEADER_SIZE {
        return Err(malformed("blob is shorter than the header"));
    }
    let header = LayoutVerified::<_, IrapBinaryHeader>::new_unaligned(&blob[..HEADER_SIZE])
        .ok_or_else(|| malformed("could not read header"))?
        .into_ref();

    let nx = header.nx.get();
    let ny = header.ny.get();
    if nx <= 0 || ny <= 0 {
        return Err(malformed("grid dimensions must be positive"));
    }

    let row_bytes = nx * 4;
    let mut body = &blob[HEADER_SIZE..];
    let mut values = Vec::with_capacity(nx as usize * ny as usize);
    for _ in 0..ny {
        if body.remaining() < 8 + row_bytes as usize {
            return Err(malformed("body ends before the last record"));
        }
        if body.get_i32() != row_bytes {
            return Err(malformed("record start marker mismatch"));
        }
        for _ in 0..nx {
            values.push(body.get_f32());
        }
        if body.get_i32() != row_bytes {
            return Err(malformed("record stop marker mismatch"));
        }
    }

    Ok(Surface {
        id_flag: header.id_flag.get(),
        nx,
        ny,
        xori: header.xori.get(),
        yori: header.yori.get(),
        xmax: header.xmax.get(),
        ymax: header.ymax.get(),
        xinc: header.xinc.get(),
        yinc: header.yinc.get(),
        rot: header.rot.get(),
        x0ori: header.x0ori.get(),
        y0ori: header.y0ori.get(),
        values,
    })
}

/// Encode a [Surface] as an Irap Binary blob.
///
/// Well-formed blobs round-trip byte-exactly through [decode] and `encode`.
pub fn encode(surface: &Surface) -> Result<Bytes, SurfaceQueryError> {
    let nx = surface.nx as usize;
    let ny = surface.ny as usize;
    if surface.nx <= 0 || surface.ny <= 0 || nx * ny != surface.values.len() {
        return Err(SurfaceQueryError::MisalignedSurfaces {
            reason: "nx * ny does not match the number of data values",
        });
    }

    let row_bytes = surface.nx * 4;
    let mut buffer = BytesMut::with_capacity(HEADER_SIZE + ny * (8 + nx * 4));
    buffer.put_slice(IrapBinaryHeader::from_surface(surface).as_bytes());
    for row in surface.values.chunks_exact(nx) {
        buffer.put_i32(row_bytes);
        for &value in row {
            buffer.put_f32(value);
        }
        buffer.put_i32(row_bytes);
    }
    Ok(buffer.freeze())
}
