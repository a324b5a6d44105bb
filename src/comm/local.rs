//! In-process message passing.
//!
//! Each rank owns one `LocalComm` and is expected to live on its own thread.
//! Ranks share nothing but channels: every ordered (source, destination)
//! pair gets a dedicated FIFO channel of byte payloads, so messages between
//! two ranks arrive in the order they were sent. Collectives are routed
//! through the coordinator.

use super::{Communicator, COORDINATOR};
use crate::error::{RelaxError, Result};
use crate::reduce;
use std::sync::mpsc::{channel, Receiver, Sender};

/// What a message carries, checked on receipt.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Tag {
    PointToPoint,
    Gather,
    Reduce,
    Broadcast,
}

#[derive(Debug)]
struct Message {
    tag: Tag,
    payload: Vec<u8>,
}

#[derive(Debug)]
pub struct LocalComm {
    rank: usize,
    /// `outboxes[dest]` sends to `dest`.
    outboxes: Vec<Sender<Message>>,
    /// `inboxes[source]` receives from `source`.
    inboxes: Vec<Receiver<Message>>,
}

impl LocalComm {
    /// Wire up `size` ranks; element `r` of the result is rank `r`.
    pub fn world(size: usize) -> Vec<LocalComm> {
        // senders[src][dst], receivers[dst][src]
        let mut senders: Vec<Vec<Sender<Message>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        let mut receivers: Vec<Vec<Receiver<Message>>> =
            (0..size).map(|_| Vec::with_capacity(size)).collect();
        for src in 0..size {
            for dst in 0..size {
                let (tx, rx) = channel();
                senders[src].push(tx);
                receivers[dst].push(rx);
                debug_assert_eq!(receivers[dst].len(), src + 1);
            }
        }
        senders
            .into_iter()
            .zip(receivers)
            .enumerate()
            .map(|(rank, (outboxes, inboxes))| LocalComm {
                rank,
                outboxes,
                inboxes,
            })
            .collect()
    }

    fn check_peer(&self, peer: usize) -> Result<()> {
        if peer >= self.outboxes.len() {
            return Err(RelaxError::comm(
                self.rank,
                format!("no rank {peer} in a world of {}", self.outboxes.len()),
            ));
        }
        Ok(())
    }

    fn post(&self, dest: usize, tag: Tag, payload: Vec<u8>) -> Result<()> {
        self.check_peer(dest)?;
        self.outboxes[dest]
            .send(Message { tag, payload })
            .map_err(|_| {
                RelaxError::comm(self.rank, format!("rank {dest} hung up"))
            })
    }

    fn take(&self, source: usize, tag: Tag) -> Result<Vec<u8>> {
        self.check_peer(source)?;
        let message = self.inboxes[source].recv().map_err(|_| {
            RelaxError::comm(self.rank, format!("rank {source} hung up"))
        })?;
        if message.tag != tag {
            return Err(RelaxError::comm(
                self.rank,
                format!(
                    "expected {:?} from rank {source}, got {:?}",
                    tag, message.tag
                ),
            ));
        }
        Ok(message.payload)
    }

    fn send_values(&self, dest: usize, tag: Tag, data: &[f64]) -> Result<()> {
        self.post(dest, tag, bytemuck::cast_slice(data).to_vec())
    }

    fn receive_values(
        &self,
        source: usize,
        tag: Tag,
        buf: &mut [f64],
    ) -> Result<()> {
        let payload = self.take(source, tag)?;
        let dst: &mut [u8] = bytemuck::cast_slice_mut(buf);
        if payload.len() != dst.len() {
            return Err(RelaxError::comm(
                self.rank,
                format!(
                    "rank {source} sent {} bytes, expected {}",
                    payload.len(),
                    dst.len()
                ),
            ));
        }
        dst.copy_from_slice(&payload);
        Ok(())
    }

    fn receive_flag(&self, source: usize, tag: Tag) -> Result<bool> {
        let payload = self.take(source, tag)?;
        match payload.as_slice() {
            [b] => Ok(*b != 0),
            _ => Err(RelaxError::comm(
                self.rank,
                format!("malformed flag from rank {source}"),
            )),
        }
    }
}

impl Communicator for LocalComm {
    fn rank(&self) -> usize {
        self.rank
    }

    fn size(&self) -> usize {
        self.outboxes.len()
    }

    fn send(&self, dest: usize, data: &[f64]) -> Result<()> {
        self.send_values(dest, Tag::PointToPoint, data)
    }

    fn receive_into(&self, source: usize, buf: &mut [f64]) -> Result<()> {
        self.receive_values(source, Tag::PointToPoint, buf)
    }

    fn gather_varcount(
        &self,
        local: &[f64],
        root_buf: Option<&mut [f64]>,
        counts: &[usize],
        displs: &[usize],
    ) -> Result<()> {
        if counts.len() != self.size() || displs.len() != self.size() {
            return Err(RelaxError::comm(
                self.rank,
                "gather layout does not match world size",
            ));
        }
        if local.len() != counts[self.rank] {
            return Err(RelaxError::comm(
                self.rank,
                format!(
                    "contributing {} values, layout says {}",
                    local.len(),
                    counts[self.rank]
                ),
            ));
        }
        if !self.is_coordinator() {
            return self.send_values(COORDINATOR, Tag::Gather, local);
        }

        let root_buf = root_buf.ok_or_else(|| {
            RelaxError::comm(self.rank, "coordinator has no gather buffer")
        })?;
        for source in 0..self.size() {
            let slot = root_buf
                .get_mut(displs[source]..displs[source] + counts[source])
                .ok_or_else(|| {
                    RelaxError::comm(
                        self.rank,
                        format!("gather slot for rank {source} out of range"),
                    )
                })?;
            if source == COORDINATOR {
                slot.copy_from_slice(local);
            } else {
                self.receive_values(source, Tag::Gather, slot)?;
            }
        }
        Ok(())
    }

    fn all_reduce_or(&self, local: bool) -> Result<bool> {
        if !self.is_coordinator() {
            self.post(COORDINATOR, Tag::Reduce, vec![local as u8])?;
            return self.receive_flag(COORDINATOR, Tag::Broadcast);
        }

        let mut flags = Vec::with_capacity(self.size());
        flags.push(local);
        for source in (0..self.size()).filter(|r| *r != COORDINATOR) {
            flags.push(self.receive_flag(source, Tag::Reduce)?);
        }
        let global = reduce::combine(flags);
        for dest in (0..self.size()).filter(|r| *r != COORDINATOR) {
            self.post(dest, Tag::Broadcast, vec![global as u8])?;
        }
        Ok(global)
    }

    fn barrier(&self) -> Result<()> {
        self.all_reduce_or(false).map(|_| ())
    }
}
