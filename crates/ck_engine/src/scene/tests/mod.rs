//! Scenario tests exercising the scene, its objects and the light buffer
//! together through the headless backend

mod log_capture;
