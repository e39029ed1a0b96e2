pub mod shared_list;
