pub(crate) mod payment_dtos;
