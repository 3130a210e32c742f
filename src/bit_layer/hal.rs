use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::{ErrorType, I2c, NoAcknowledgeSource, Operation, SevenBitAddress};

use super::{address_byte, Error, Line, Phase, RWBit, UsiMaster};

impl<L, D> ErrorType for UsiMaster<L, D>
where
    L: Line,
    D: DelayNs,
{
    type Error = Error<L::Error>;
}

impl<L, D> I2c<SevenBitAddress> for UsiMaster<L, D>
where
    L: Line,
    D: DelayNs,
{
    /// Runs `operations` as one transaction. A change between reading and
    /// writing costs a repeated start and a fresh address byte. The bus is
    /// always left idle, even when a byte is not acknowledged. Empty reads
    /// are skipped.
    fn transaction(
        &mut self,
        address: SevenBitAddress,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Self::Error> {
        if address > 0x7F {
            return Err(Error::InvalidAddress(address));
        }
        if operations.is_empty() {
            return Ok(());
        }

        match self.run_operations(address, operations) {
            Ok(()) if self.phase() == Phase::Active => self.stop(),
            Ok(()) => Ok(()),
            Err(error) => {
                if self.phase() == Phase::Active {
                    if let Err(stop_error) = self.stop() {
                        warn!("Could not stop after failed transaction: {:?}", stop_error);
                    }
                }
                Err(error)
            }
        }
    }
}

impl<L, D> UsiMaster<L, D>
where
    L: Line,
    D: DelayNs,
{
    fn run_operations(
        &mut self,
        address: u8,
        operations: &mut [Operation<'_>],
    ) -> Result<(), Error<L::Error>> {
        // an empty read has no byte to NACK, so it must not open a read run
        let transfers: Vec<usize> = (0..operations.len())
            .filter(|&index| {
                !matches!(operations[index], Operation::Read(ref buffer) if buffer.is_empty())
            })
            .collect();
        let mut previous: Option<RWBit> = None;

        for (position, &index) in transfers.iter().enumerate() {
            let next_is_read = transfers
                .get(position + 1)
                .map_or(false, |&next| matches!(operations[next], Operation::Read(_)));

            let rw = match operations[index] {
                Operation::Read(_) => RWBit::Read,
                Operation::Write(_) => RWBit::Write,
            };
            if previous != Some(rw) {
                self.start()?;
                let ack = self.write_byte(address_byte(address, rw))?;
                if !ack.is_ack() {
                    debug!("Address {:#04x} not acknowledged", address);
                    return Err(Error::Nack(NoAcknowledgeSource::Address));
                }
            }
            previous = Some(rw);

            match operations[index] {
                Operation::Write(ref bytes) => {
                    for &byte in bytes.iter() {
                        if !self.write_byte(byte)?.is_ack() {
                            debug!("Data byte {:#04x} not acknowledged", byte);
                            return Err(Error::Nack(NoAcknowledgeSource::Data));
                        }
                    }
                }
                Operation::Read(ref mut buffer) => {
                    let count = buffer.len();
                    for (position, slot) in buffer.iter_mut().enumerate() {
                        let last = position + 1 == count && !next_is_read;
                        *slot = self.read_byte(last)?;
                    }
                }
            }
        }

        Ok(())
    }
}
