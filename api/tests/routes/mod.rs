mod checkin_test;
mod events_test;
mod health_test;
mod qr_test;
