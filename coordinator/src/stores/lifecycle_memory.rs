//! In-memory lifecycle repository.
//!
//! Stands in for durable storage in tests and single-process demos.

use crate::error::{BookingError, Result};
use crate::lifecycle::{BookingStatus, PaymentStatus};
use crate::providers::{LifecycleRepository, NewBooking};
use crate::state::{BookingId, BookingRecord, PaymentId, PaymentRecord};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Default)]
struct Tables {
    bookings: HashMap<BookingId, BookingRecord>,
    payments: HashMap<PaymentId, PaymentRecord>,
    next_booking: u64,
    next_payment: u64,
}

/// Mutex-guarded booking and payment tables.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLifecycleRepository {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryLifecycleRepository {
    /// Create an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| BookingError::StoreUnavailable("Mutex lock failed".to_string()))
    }

    /// Number of bookings held (for testing).
    ///
    /// # Errors
    ///
    /// Returns error if the lock is poisoned.
    pub fn booking_count(&self) -> Result<usize> {
        Ok(self.lock()?.bookings.len())
    }
}

#[async_trait]
impl LifecycleRepository for InMemoryLifecycleRepository {
    async fn create_booking(&self, booking: NewBooking) -> Result<(BookingRecord, PaymentRecord)> {
        let mut tables = self.lock()?;

        tables.next_booking += 1;
        tables.next_payment += 1;
        let booking_id = BookingId(tables.next_booking);
        let payment_id = PaymentId(tables.next_payment);

        let payment = PaymentRecord::open(payment_id, booking_id, booking.created_at);
        let record = BookingRecord {
            id: booking_id,
            booking_number: booking.booking_number,
            invoice_number: booking.invoice_number,
            brand: booking.brand,
            status: BookingStatus::Pending,
            active_payment: Some(payment_id),
            details: booking.details,
            created_at: booking.created_at,
            updated_at: booking.created_at,
        };

        tables.bookings.insert(booking_id, record.clone());
        tables.payments.insert(payment_id, payment.clone());
        Ok((record, payment))
    }

    async fn load_booking(&self, id: BookingId) -> Result<BookingRecord> {
        self.lock()?
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound {
                entity: "booking",
                id: id.to_string(),
            })
    }

    async fn save_booking(
        &self,
        booking: &BookingRecord,
        expected: BookingStatus,
        payment: Option<&PaymentRecord>,
    ) -> Result<()> {
        let mut tables = self.lock()?;

        if let Some(guard) = payment {
            let stored = tables.payments.get(&guard.id).ok_or_else(|| BookingError::NotFound {
                entity: "payment",
                id: guard.id.to_string(),
            })?;
            if stored.status != guard.status {
                return Err(BookingError::Conflict {
                    entity: "payment",
                    id: guard.id.to_string(),
                });
            }
        }

        let slot = tables
            .bookings
            .get_mut(&booking.id)
            .ok_or_else(|| BookingError::NotFound {
                entity: "booking",
                id: booking.id.to_string(),
            })?;
        if slot.status != expected {
            return Err(BookingError::Conflict {
                entity: "booking",
                id: booking.id.to_string(),
            });
        }
        *slot = booking.clone();
        Ok(())
    }

    async fn load_payment(&self, id: PaymentId) -> Result<PaymentRecord> {
        self.lock()?
            .payments
            .get(&id)
            .cloned()
            .ok_or_else(|| BookingError::NotFound {
                entity: "payment",
                id: id.to_string(),
            })
    }

    async fn save_payment(&self, payment: &PaymentRecord, expected: PaymentStatus) -> Result<()> {
        let mut tables = self.lock()?;
        let slot = tables
            .payments
            .get_mut(&payment.id)
            .ok_or_else(|| BookingError::NotFound {
                entity: "payment",
                id: payment.id.to_string(),
            })?;
        if slot.status != expected {
            return Err(BookingError::Conflict {
                entity: "payment",
                id: payment.id.to_string(),
            });
        }
        *slot = payment.clone();
        Ok(())
    }
}
