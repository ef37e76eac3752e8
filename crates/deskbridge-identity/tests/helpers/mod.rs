pub mod mock_support_desk;
pub mod test_data;
