pub mod recommend_controller;
