pub mod test_member_leaves;
