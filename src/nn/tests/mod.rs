mod layer_dropout;
mod layer_pool;
mod loss;
mod param;
mod summary;
