//! Binary stream and file persistence.

use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use ndarray::Array1;
use tracing::{debug, error};

use crate::error::{Error, Result};
use crate::gaussian::Component;
use crate::mixture::GaussianMixture;

impl<const D: usize, G: Component<D>> GaussianMixture<D, G> {
    /// Write the model to a binary stream.
    pub fn write_binary<W: Write>(&self, out: &mut W) -> Result<()> {
        out.write_i32::<LittleEndian>(D as i32)?;
        out.write_i32::<LittleEndian>(self.num_states() as i32)?;
        out.write_u8(u8::from(self.initialized))?;
        for &p in self.priors.iter() {
            out.write_f64::<LittleEndian>(p)?;
        }
        for g in &self.components {
            g.write_binary(out)?;
        }
        Ok(())
    }

    /// Read a model written by [`GaussianMixture::write_binary`].
    ///
    /// The stored dimension must equal `D`. Priors and components are staged
    /// as they are read and only replace the model once the whole stream
    /// has been consumed, so a failed read leaves the model untouched and a
    /// bogus state count runs into end-of-stream instead of a huge
    /// allocation.
    pub fn read_binary<R: Read>(&mut self, input: &mut R) -> Result<()> {
        let dim = input.read_i32::<LittleEndian>()?;
        if dim != D as i32 {
            error!(stored = dim, expected = D, "stored gaussian mixture has wrong dimension");
            return Err(Error::DimensionMismatch {
                expected: D,
                found: usize::try_from(dim).unwrap_or(0),
            });
        }

        let num_states = input.read_i32::<LittleEndian>()?;
        let num_states = usize::try_from(num_states)
            .map_err(|_| Error::Corrupt(format!("negative state count {num_states}")))?;

        let initialized = input.read_u8()? != 0;
        let mut priors = Vec::new();
        for _ in 0..num_states {
            priors.push(input.read_f64::<LittleEndian>()?);
        }
        let mut components = Vec::new();
        for _ in 0..num_states {
            let mut g = G::default();
            g.read_binary(input)?;
            components.push(g);
        }

        self.priors = Array1::from(priors);
        self.components = components;
        self.initialized = initialized;
        Ok(())
    }

    /// Write the model to a binary file, replacing it if it exists.
    pub fn to_binary_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let result = File::create(path).map_err(Error::from).and_then(|file| {
            let mut out = BufWriter::new(file);
            self.write_binary(&mut out)?;
            out.flush()?;
            Ok(())
        });
        match &result {
            Ok(()) => debug!(path = %path.display(), states = self.num_states(), "wrote gaussian mixture model"),
            Err(e) => error!(path = %path.display(), error = %e, "failed to write gaussian mixture model"),
        }
        result
    }

    /// Read the model from a binary file.
    pub fn from_binary_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let result = File::open(path)
            .map_err(Error::from)
            .and_then(|file| self.read_binary(&mut BufReader::new(file)));
        match &result {
            Ok(()) => debug!(path = %path.display(), states = self.num_states(), "loaded gaussian mixture model"),
            Err(e) => error!(path = %path.display(), error = %e, "failed to load gaussian mixture model"),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use crate::{Component, Error, GaussianMixture};

    fn sample_model() -> GaussianMixture<2> {
        let mut gmm = GaussianMixture::<2>::new();
        gmm.set_num_states(2)
            .set_priors(&[0.25, 0.75])
            .set_mean(0, &[1.0, 2.0])
            .set_mean(1, &[-3.0, 0.5])
            .set_covariance(1, &[[2.0, 0.3], [0.3, 1.0]]);
        gmm.force_initialize();
        gmm
    }

    #[test]
    fn test_binary_header_layout() {
        let gmm = sample_model();
        let mut buf = Vec::new();
        gmm.write_binary(&mut buf).unwrap();

        assert_eq!(&buf[0..4], &2i32.to_le_bytes());
        assert_eq!(&buf[4..8], &2i32.to_le_bytes());
        assert_eq!(buf[8], 1);
        assert_eq!(&buf[9..17], &0.25f64.to_le_bytes());
        // header + priors + 2 * (mean + covariance)
        assert_eq!(buf.len(), 4 + 4 + 1 + 2 * 8 + 2 * (2 + 4) * 8);
    }

    #[test]
    fn test_binary_roundtrip() {
        let gmm = sample_model();
        let mut buf = Vec::new();
        gmm.write_binary(&mut buf).unwrap();

        let mut back = GaussianMixture::<2>::new();
        back.read_binary(&mut &buf[..]).unwrap();

        assert_eq!(back.num_states(), 2);
        assert!(back.is_initialized());
        for s in 0..2 {
            assert_eq!(back.prior(s).to_bits(), gmm.prior(s).to_bits());
            assert_eq!(back.component(s), gmm.component(s));
        }
        assert_eq!(back.component(1).covariance()[[0, 1]], 0.3);
    }

    #[test]
    fn test_uninitialized_flag_roundtrip() {
        let mut gmm = GaussianMixture::<2>::new();
        gmm.set_num_states(3);
        let mut buf = Vec::new();
        gmm.write_binary(&mut buf).unwrap();

        let mut back = GaussianMixture::<2>::new();
        back.force_initialize();
        back.read_binary(&mut &buf[..]).unwrap();
        assert!(!back.is_initialized());
        assert_eq!(back.num_states(), 3);
    }

    #[test]
    fn test_read_rejects_other_dimension() {
        let gmm = sample_model();
        let mut buf = Vec::new();
        gmm.write_binary(&mut buf).unwrap();

        let mut other = GaussianMixture::<3>::new();
        let err = other.read_binary(&mut &buf[..]).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { expected: 3, found: 2 }));
    }

    #[test]
    fn test_read_rejects_negative_state_count() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend_from_slice(&(-1i32).to_le_bytes());
        let mut gmm = GaussianMixture::<2>::new();
        assert!(matches!(gmm.read_binary(&mut &buf[..]), Err(Error::Corrupt(_))));
    }

    #[test]
    fn test_read_huge_state_count_without_body() {
        let mut buf = Vec::new();
        buf.extend_from_slice(&2i32.to_le_bytes());
        buf.extend_from_slice(&i32::MAX.to_le_bytes());
        buf.push(1);

        let mut gmm = GaussianMixture::<2>::new();
        gmm.set_num_states(1);
        assert!(matches!(gmm.read_binary(&mut &buf[..]), Err(Error::Io(_))));
        // Nothing was replaced.
        assert_eq!(gmm.num_states(), 1);
        assert!(!gmm.is_initialized());
    }

    #[test]
    fn test_read_truncated_stream() {
        let gmm = sample_model();
        let mut buf = Vec::new();
        gmm.write_binary(&mut buf).unwrap();
        buf.truncate(buf.len() - 3);

        let mut back = GaussianMixture::<2>::new();
        assert!(matches!(back.read_binary(&mut &buf[..]), Err(Error::Io(_))));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let mut gmm = GaussianMixture::<2>::new();
        let result = gmm.from_binary_file(dir.path().join("absent.gmm"));
        assert!(matches!(result, Err(Error::Io(_))));
    }
}
